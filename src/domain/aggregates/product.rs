//! Catalog Aggregates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::value_objects::{AccountId, CategoryId, Money, ProductId, Slug};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

impl Category {
    pub fn url(&self) -> String { format!("/?category={}", self.slug) }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub old_price: Option<Money>,
    pub image: Option<String>,
    pub sizes: String,
    pub colors: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn url(&self) -> String { format!("/product/{}/", self.id) }
    pub fn size_options(&self) -> Vec<&str> { split_options(&self.sizes, ',') }
    pub fn color_options(&self) -> Vec<&str> { split_options(&self.colors, ',') }
    pub fn is_on_sale(&self) -> bool { self.old_price.is_some_and(|old| old > self.price) }

    /// First `limit` characters of the description, used by the bot listing.
    pub fn short_description(&self, limit: usize) -> String { self.description.chars().take(limit).collect() }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProductImage {
    pub id: i64,
    pub product_id: ProductId,
    pub image: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Review {
    pub id: i64,
    pub product_id: ProductId,
    pub account_id: AccountId,
    pub author: String,
    pub rating: i32,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Splits a free-text option list ("S, M, L") into trimmed, non-empty entries.
pub fn split_options(value: &str, separator: char) -> Vec<&str> {
    value.split(separator).map(str::trim).filter(|s| !s.is_empty()).collect()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub slug: Option<String>,
}

impl NewCategory {
    /// Slug to store: the explicit one, or one derived from the name.
    pub fn slug(&self) -> Result<Slug, crate::domain::value_objects::ValueError> {
        match &self.slug {
            Some(slug) => Slug::new(slug.clone()),
            None => Slug::new(slugify(&self.name)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProduct {
    pub category_id: CategoryId,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(range(min = 0))]
    pub old_price: Option<i64>,
    pub image: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub sizes: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub colors: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub gallery: Vec<String>,
}

fn default_true() -> bool { true }

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewReview {
    #[validate(range(min = 1, max = 5))]
    #[serde(default = "default_rating")]
    pub rating: i32,
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

fn default_rating() -> i32 { 5 }

/// Lowercases and replaces anything that is not a slug character with `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
