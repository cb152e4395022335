use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session;
use super::SharedState;
use crate::domain::aggregates::{Cart, Favorites};
use crate::i18n::{Lang, Translations};
use crate::settings::SiteSettings;
use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel { Success, Info, Error }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub text: String,
}

/// Data every storefront view carries: badges, language, strings and pending messages.
#[derive(Debug, Serialize)]
pub struct GlobalContext {
    pub cart_count: u32,
    pub fav_count: usize,
    pub lang: Lang,
    pub t: &'static Translations,
    pub messages: Vec<Flash>,
    pub site_name: String,
    pub meta_description: String,
    pub show_ticker: bool,
}

impl GlobalContext {
    pub fn new(cart: &Cart, favorites: &Favorites, lang: Lang, messages: Vec<Flash>, settings: &SiteSettings) -> Self {
        Self {
            cart_count: cart.count(),
            fav_count: favorites.len(),
            lang,
            t: lang.translations(),
            messages,
            site_name: settings.site_name.clone(),
            meta_description: settings.meta_description.clone(),
            show_ticker: settings.show_ticker,
        }
    }

    pub async fn load(state: &SharedState, session: &Session, headers: &HeaderMap) -> Result<Self> {
        let cart = session::cart(session).await?;
        let favorites = session::favorites(session).await?;
        let messages = session::take_messages(session).await?;
        let settings = state.db.site_settings().await?;
        Ok(Self::new(&cart, &favorites, request_lang(headers), messages, &settings))
    }
}

pub fn request_lang(headers: &HeaderMap) -> Lang {
    Lang::from_cookie_header(headers.get(header::COOKIE).and_then(|v| v.to_str().ok()))
}

/// A view model together with the global context, flattened into one JSON object.
#[derive(Debug, Serialize)]
pub struct View<T: Serialize> {
    #[serde(flatten)]
    pub context: GlobalContext,
    #[serde(flatten)]
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_counts_and_language() {
        let mut cart = Cart::new();
        cart.add(5);
        cart.add(5);
        cart.add(7);
        let mut favorites = Favorites::default();
        favorites.toggle(1);

        let ctx = GlobalContext::new(&cart, &favorites, Lang::En, vec![], &SiteSettings::default());
        assert_eq!(ctx.cart_count, 3);
        assert_eq!(ctx.fav_count, 1);
        assert_eq!(ctx.t["home"], "Home");

        let json = serde_json::to_value(View { context: ctx, data: serde_json::json!({"products": []}) }).unwrap();
        assert_eq!(json["lang"], "en");
        assert_eq!(json["t"]["home"], "Home");
        assert_eq!(json["site_name"], "DEBORAH");
        assert!(json["products"].is_array());
    }
}
