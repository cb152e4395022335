use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::instrument;

use super::{is_unique_violation, Db};
use crate::domain::aggregates::{Category, NewCategory, NewProduct, NewReview, Product, ProductImage, Review};
use crate::domain::value_objects::{AccountId, CategoryId, Money, ProductId};
use crate::{Result, ShopError};

const PRODUCT_COLUMNS: &str = "p.id, p.category_id, p.name, p.description, p.price, p.old_price, p.image, p.sizes, p.colors, p.is_active, p.created_at";

/// Home page filters: name search and category slug.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub query: Option<String>,
    pub category_slug: Option<String>,
}

#[derive(FromRow)]
struct CategoryRow { id: i64, name: String, slug: String }

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self { Category { id: row.id, name: row.name, slug: row.slug } }
}

#[derive(FromRow)]
struct ProductRow {
    id: i64,
    category_id: i64,
    name: String,
    description: String,
    price: Decimal,
    old_price: Option<Decimal>,
    image: Option<String>,
    sizes: String,
    colors: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> Result<Product> {
        Ok(Product {
            id: self.id,
            category_id: self.category_id,
            name: self.name,
            description: self.description,
            price: Money::new(self.price)?,
            old_price: self.old_price.map(Money::new).transpose()?,
            image: self.image,
            sizes: self.sizes,
            colors: self.colors,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>> {
    rows.into_iter().map(ProductRow::into_product).collect()
}

#[derive(FromRow)]
struct ReviewRow {
    id: i64,
    product_id: i64,
    account_id: i64,
    author: String,
    rating: i32,
    text: String,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(r: ReviewRow) -> Self {
        Review { id: r.id, product_id: r.product_id, account_id: r.account_id, author: r.author, rating: r.rating, text: r.text, created_at: r.created_at }
    }
}

impl Db {
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query_as::<Postgres, CategoryRow>("SELECT id, name, slug FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn create_category(&self, input: &NewCategory) -> Result<Category> {
        let slug = input.slug()?;
        let row = sqlx::query_as::<Postgres, CategoryRow>("INSERT INTO categories (name, slug) VALUES ($1, $2) RETURNING id, name, slug")
            .bind(input.name.trim())
            .bind(slug.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| if is_unique_violation(&e) { ShopError::Validation(format!("slug '{slug}' is already used")) } else { e.into() })?;
        Ok(row.into())
    }

    /// Active products, newest first.
    #[instrument(skip(self))]
    pub async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products p JOIN categories c ON c.id = p.category_id WHERE p.is_active"));
        if let Some(q) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            qb.push(" AND p.name ILIKE ").push_bind(format!("%{}%", escape_like(q)));
        }
        if let Some(slug) = filter.category_slug.as_deref().filter(|s| !s.is_empty()) {
            qb.push(" AND c.slug = ").push_bind(slug.to_string());
        }
        qb.push(" ORDER BY p.created_at DESC, p.id DESC");
        let rows = qb.build_query_as::<ProductRow>().fetch_all(&self.pool).await?;
        into_products(rows)
    }

    #[instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query_as::<Postgres, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1 AND p.is_active"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ProductRow::into_product).transpose()
    }

    /// Products by id regardless of the active flag; ids that do not exist are absent.
    #[instrument(skip(self))]
    pub async fn products_by_ids(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>> {
        if ids.is_empty() { return Ok(HashMap::new()); }
        let rows = sqlx::query_as::<Postgres, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(into_products(rows)?.into_iter().map(|p| (p.id, p)).collect())
    }

    #[instrument(skip(self))]
    pub async fn products_in_category(&self, category_id: CategoryId, limit: i64) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<Postgres, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.category_id = $1 AND p.is_active ORDER BY p.created_at DESC, p.id DESC LIMIT $2"
        ))
        .bind(category_id)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        into_products(rows)
    }

    /// Other active products from the same category.
    #[instrument(skip(self, product), fields(product_id = product.id))]
    pub async fn related_products(&self, product: &Product, limit: i64) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<Postgres, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.category_id = $1 AND p.id <> $2 AND p.is_active ORDER BY p.created_at DESC LIMIT $3"
        ))
        .bind(product.category_id)
        .bind(product.id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        into_products(rows)
    }

    #[instrument(skip(self))]
    pub async fn product_images(&self, product_id: ProductId) -> Result<Vec<ProductImage>> {
        let rows: Vec<(i64, i64, String)> = sqlx::query_as("SELECT id, product_id, image FROM product_images WHERE product_id = $1 ORDER BY id")
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id, product_id, image)| ProductImage { id, product_id, image }).collect())
    }

    #[instrument(skip(self))]
    pub async fn reviews(&self, product_id: ProductId) -> Result<Vec<Review>> {
        let rows = sqlx::query_as::<Postgres, ReviewRow>(
            "SELECT r.id, r.product_id, r.account_id, COALESCE(NULLIF(a.first_name, ''), a.username) AS author, r.rating, r.text, r.created_at \
             FROM reviews r JOIN accounts a ON a.id = r.account_id WHERE r.product_id = $1 ORDER BY r.created_at DESC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    #[instrument(skip(self, input))]
    pub async fn create_review(&self, product_id: ProductId, account_id: AccountId, input: &NewReview) -> Result<Review> {
        let row = sqlx::query_as::<Postgres, ReviewRow>(
            "WITH r AS (INSERT INTO reviews (product_id, account_id, rating, text) VALUES ($1, $2, $3, $4) RETURNING *) \
             SELECT r.id, r.product_id, r.account_id, COALESCE(NULLIF(a.first_name, ''), a.username) AS author, r.rating, r.text, r.created_at \
             FROM r JOIN accounts a ON a.id = r.account_id",
        )
        .bind(product_id)
        .bind(account_id)
        .bind(input.rating)
        .bind(input.text.trim())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    /// Inserts the product and its gallery in one transaction.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: &NewProduct) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<Postgres, ProductRow>(
            "INSERT INTO products (category_id, name, description, price, old_price, image, sizes, colors, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id, category_id, name, description, price, old_price, image, sizes, colors, is_active, created_at",
        )
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(Decimal::from(input.price))
        .bind(input.old_price.map(Decimal::from))
        .bind(&input.image)
        .bind(&input.sizes)
        .bind(&input.colors)
        .bind(input.is_active)
        .fetch_one(&mut *tx)
        .await?;
        for image in &input.gallery {
            sqlx::query("INSERT INTO product_images (product_id, image) VALUES ($1, $2)")
                .bind(row.id)
                .bind(image)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        row.into_product()
    }

    /// Overwrites the product fields; a non-empty gallery replaces the stored one.
    #[instrument(skip(self, input))]
    pub async fn update_product(&self, id: ProductId, input: &NewProduct) -> Result<Option<Product>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<Postgres, ProductRow>(
            "UPDATE products SET category_id = $2, name = $3, description = $4, price = $5, old_price = $6, image = $7, sizes = $8, colors = $9, is_active = $10 \
             WHERE id = $1 \
             RETURNING id, category_id, name, description, price, old_price, image, sizes, colors, is_active, created_at",
        )
        .bind(id)
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(Decimal::from(input.price))
        .bind(input.old_price.map(Decimal::from))
        .bind(&input.image)
        .bind(&input.sizes)
        .bind(&input.colors)
        .bind(input.is_active)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else { return Ok(None) };
        if !input.gallery.is_empty() {
            sqlx::query("DELETE FROM product_images WHERE product_id = $1").bind(id).execute(&mut *tx).await?;
            for image in &input.gallery {
                sqlx::query("INSERT INTO product_images (product_id, image) VALUES ($1, $2)")
                    .bind(id)
                    .bind(image)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;
        row.into_product().map(Some)
    }

    /// Hides the product from the storefront; order history keeps referencing it.
    #[instrument(skip(self))]
    pub async fn deactivate_product(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("UPDATE products SET is_active = FALSE WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

fn escape_like(value: &str) -> String {
    value.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
