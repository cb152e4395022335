//! Typed access to the visitor's session record.

use axum::http::{header, HeaderMap};
use tower_sessions::Session;

use super::context::{Flash, FlashLevel};
use crate::domain::aggregates::{Cart, Favorites};
use crate::domain::value_objects::AccountId;
use crate::{Result, ShopError};

pub const SESSION_INACTIVITY_DAYS: i64 = 14;

const CART_KEY: &str = "cart";
const FAVORITES_KEY: &str = "favorites";
const ACCOUNT_KEY: &str = "account_id";
const MESSAGES_KEY: &str = "_messages";

fn session_error(err: tower_sessions::session::Error) -> ShopError {
    ShopError::Session(err.to_string())
}

pub async fn cart(session: &Session) -> Result<Cart> {
    Ok(session.get::<Cart>(CART_KEY).await.map_err(session_error)?.unwrap_or_default())
}

pub async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(CART_KEY, cart).await.map_err(session_error)
}

pub async fn favorites(session: &Session) -> Result<Favorites> {
    Ok(session.get::<Favorites>(FAVORITES_KEY).await.map_err(session_error)?.unwrap_or_default())
}

pub async fn save_favorites(session: &Session, favorites: &Favorites) -> Result<()> {
    session.insert(FAVORITES_KEY, favorites).await.map_err(session_error)
}

pub async fn account_id(session: &Session) -> Result<Option<AccountId>> {
    session.get::<AccountId>(ACCOUNT_KEY).await.map_err(session_error)
}

/// Binds the session to `account_id` under a fresh session id.
pub async fn login(session: &Session, account_id: AccountId) -> Result<()> {
    session.cycle_id().await.map_err(session_error)?;
    session.insert(ACCOUNT_KEY, account_id).await.map_err(session_error)
}

/// Drops the whole session, cart and favorites included.
pub async fn logout(session: &Session) -> Result<()> {
    session.flush().await.map_err(session_error)
}

pub async fn flash(session: &Session, level: FlashLevel, text: impl Into<String>) -> Result<()> {
    let mut messages: Vec<Flash> = session.get(MESSAGES_KEY).await.map_err(session_error)?.unwrap_or_default();
    messages.push(Flash { level, text: text.into() });
    session.insert(MESSAGES_KEY, messages).await.map_err(session_error)
}

/// Pending flash messages; reading them consumes them.
pub async fn take_messages(session: &Session) -> Result<Vec<Flash>> {
    Ok(session.remove::<Vec<Flash>>(MESSAGES_KEY).await.map_err(session_error)?.unwrap_or_default())
}

/// Where "back" points: the Referer header, or the home page.
pub fn back_or_home(headers: &HeaderMap) -> String {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("/")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_back_or_home() {
        let mut headers = HeaderMap::new();
        assert_eq!(back_or_home(&headers), "/");
        headers.insert(header::REFERER, HeaderValue::from_static("/product/5/"));
        assert_eq!(back_or_home(&headers), "/product/5/");
    }
}
