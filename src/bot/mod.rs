//! Telegram bot sales channel.
//!
//! Browsing, a per-chat cart and one-tap checkout into the same order ledger
//! the storefront uses. Chat identities are linked to storefront accounts when
//! the user shares their phone contact.

pub mod app;
pub mod callbacks;
pub mod carts;
pub mod commands;
pub mod context;
pub mod handlers;

pub type HandlerResult = anyhow::Result<()>;

pub use app::App;
pub use carts::{BotCartStore, InMemoryBotCarts};
pub use commands::Command;
pub use context::AppContext;
pub use handlers::build_schema;
