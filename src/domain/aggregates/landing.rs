//! Landing Page Aggregate
//!
//! A promotional page owns an ordered list of typed content blocks. Each block
//! kind carries only the fields it renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::value_objects::CategoryId;

pub const FONT_CHOICES: [&str; 18] = [
    "Playfair Display", "Cormorant Garamond", "Montserrat", "Lato", "Open Sans", "Roboto", "Oswald",
    "Merriweather", "Raleway", "Nunito", "Didot", "Bodoni Moda", "Tenor Sans", "Italiana", "Prata",
    "Marcellus", "Comfortaa", "Caveat",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Background {
    Color(String),
    Gradient(String),
    Image(String),
}

impl Default for Background {
    fn default() -> Self { Self::Color("#ffffff".into()) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment { Left, #[default] Center, Right }

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Left => "left", Self::Center => "center", Self::Right => "right" }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "block_type", rename_all = "lowercase")]
pub enum BlockKind {
    Text {
        content: String,
        #[serde(default = "default_font")]
        font: String,
        #[serde(default = "default_text_size")]
        size: i32,
        #[serde(default = "default_color")]
        color: String,
        #[serde(default)]
        alignment: Alignment,
    },
    Image {
        image: String,
        #[serde(default = "default_image_width")]
        width: i32,
    },
    Button {
        text: String,
        link: String,
        #[serde(default = "default_color")]
        color: String,
    },
    Products {
        category_id: Option<CategoryId>,
        #[serde(default = "default_products_limit")]
        limit: i32,
    },
}

fn default_font() -> String { "Lato".into() }
fn default_text_size() -> i32 { 16 }
fn default_color() -> String { "#000000".into() }
fn default_image_width() -> i32 { 100 }
fn default_products_limit() -> i32 { 4 }
fn default_position() -> i32 { 10 }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingBlock {
    #[serde(default)]
    pub id: i64,
    #[serde(flatten)]
    pub kind: BlockKind,
    #[serde(default = "default_position")]
    pub position_top: i32,
    #[serde(default = "default_position")]
    pub position_left: i32,
    #[serde(default)]
    pub order: i32,
}

impl LandingBlock {
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            BlockKind::Text { .. } => "text",
            BlockKind::Image { .. } => "image",
            BlockKind::Button { .. } => "button",
            BlockKind::Products { .. } => "products",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LandingPage {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub background: Background,
    pub meta_title: String,
    pub meta_description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub blocks: Vec<LandingBlock>,
}

impl LandingPage {
    pub fn url(&self) -> String { format!("/page/{}/", self.slug) }

    /// Blocks by ascending `order`; blocks sharing a value keep their stored order.
    pub fn ordered_blocks(&self) -> Vec<&LandingBlock> {
        let mut blocks: Vec<&LandingBlock> = self.blocks.iter().collect();
        blocks.sort_by_key(|b| b.order);
        blocks
    }

    /// Category ids referenced by product-grid blocks.
    pub fn product_categories(&self) -> Vec<(CategoryId, i32)> {
        self.blocks.iter().filter_map(|b| match b.kind {
            BlockKind::Products { category_id: Some(id), limit } => Some((id, limit)),
            _ => None,
        }).collect()
    }
}

/// Admin upsert payload; the slug comes from the path.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewLandingPage {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub background: Background,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub meta_title: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    #[validate(custom = "validate_blocks")]
    pub blocks: Vec<LandingBlock>,
}

fn default_active() -> bool { true }

fn validate_blocks(blocks: &[LandingBlock]) -> Result<(), ValidationError> {
    if blocks.iter().any(|b| b.order < 0) {
        return Err(ValidationError::new("negative_block_order"));
    }
    let unknown_font = blocks.iter().any(|b| matches!(&b.kind, BlockKind::Text { font, .. } if !FONT_CHOICES.contains(&font.as_str())));
    if unknown_font {
        return Err(ValidationError::new("unknown_font"));
    }
    Ok(())
}

/// A banner in the scrolling ticker, linking either to a URL or to a landing page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TickerItem {
    pub id: i64,
    pub image: String,
    pub link: TickerLink,
    pub order: i32,
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TickerLink {
    Url { url: String },
    Landing { slug: Option<String> },
}

impl TickerItem {
    pub fn href(&self) -> String {
        match &self.link {
            TickerLink::Landing { slug: Some(slug) } => format!("/page/{slug}/"),
            TickerLink::Url { url } if !url.is_empty() => url.clone(),
            _ => "#".into(),
        }
    }
}
