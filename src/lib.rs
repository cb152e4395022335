//! Deborah Shop
//!
//! Clothing storefront for a single merchant.
//!
//! ## Features
//! - Catalog with categories, galleries, sizes/colors and reviews
//! - Session cart and favorites
//! - Checkout into an order ledger with payment hand-off (WayForPay / LiqPay)
//! - Telegram notifications on new orders and tracking numbers
//! - Promotional landing pages built from ordered content blocks
//! - Telegram bot sales channel sharing the same order ledger
//! - Admin JSON API with CSV order export

use thiserror::Error;

pub mod bot;
pub mod config;
pub mod db;
pub mod domain;
pub mod export;
pub mod http;
pub mod i18n;
pub mod landing;
pub mod notify;
pub mod payment;
pub mod services;
pub mod settings;
pub mod telemetry;

use domain::aggregates::{CartError, OrderError};
use domain::value_objects::ValueError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Page not found")]
    PageNotFound,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Login required")]
    LoginRequired,

    #[error("Staff access required")]
    Forbidden,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] sqlx::Error),
}

impl From<validator::ValidationErrors> for ShopError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<&str> = errors.field_errors().into_keys().collect();
        fields.sort_unstable();
        Self::Validation(format!("invalid fields: {}", fields.join(", ")))
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;
