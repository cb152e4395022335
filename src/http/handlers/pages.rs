use std::collections::HashMap;
use std::fmt::Write;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;

use crate::db::ProductFilter;
use crate::domain::value_objects::CategoryId;
use crate::http::session::back_or_home;
use crate::http::SharedState;
use crate::i18n::{Lang, LANG_COOKIE};
use crate::landing::{self, escape};
use crate::{Result, ShopError};

const LANG_COOKIE_DAYS: i64 = 365;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "deborah-shop"}))
}

/// Serves an active landing page as HTML.
pub async fn landing(State(state): State<SharedState>, Path(slug): Path<String>) -> Result<Html<String>> {
    let page = state.db.landing_page(&slug).await?.filter(|p| p.is_active).ok_or(ShopError::PageNotFound)?;
    let mut products = HashMap::<CategoryId, Vec<_>>::new();
    for (category_id, limit) in page.product_categories() {
        let listed = state.db.products_in_category(category_id, i64::from(limit)).await?;
        let entry = products.entry(category_id).or_default();
        if listed.len() > entry.len() { *entry = listed; }
    }
    Ok(Html(landing::render(&page, &products)))
}

/// Stores the language choice in a year-long cookie and goes back.
pub async fn set_language(headers: HeaderMap, Path(lang): Path<String>) -> Response {
    let Ok(lang) = lang.parse::<Lang>() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let cookie = cookie::Cookie::build((LANG_COOKIE, lang.as_str()))
        .path("/")
        .max_age(time::Duration::days(LANG_COOKIE_DAYS))
        .build();
    ([(header::SET_COOKIE, cookie.to_string())], Redirect::to(&back_or_home(&headers))).into_response()
}

pub async fn sitemap(State(state): State<SharedState>, headers: HeaderMap) -> Result<Response> {
    let host = headers.get(header::HOST).and_then(|h| h.to_str().ok()).unwrap_or("localhost");
    let base = format!("http://{host}");
    let products = state.db.products(&ProductFilter::default()).await?;
    let categories = state.db.categories().await?;

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    let urls = products.iter().map(|p| p.url()).chain(categories.iter().map(|c| c.url()));
    for url in urls {
        let _ = writeln!(xml, "<url><loc>{}</loc></url>", escape(&format!("{base}{url}")));
    }
    xml.push_str("</urlset>\n");
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml).into_response())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/set-lang/:lang/", get(super::set_language))
            .route("/health", get(super::health))
    }

    #[tokio::test]
    async fn test_set_language_cookie() {
        let response = app()
            .oneshot(Request::get("/set-lang/en/").header("referer", "/cart/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/cart/");
        let cookie = response.headers()["set-cookie"].to_str().unwrap();
        assert!(cookie.starts_with("lang=en"));
        assert!(cookie.contains("Max-Age=31536000"));
    }

    #[tokio::test]
    async fn test_unknown_language_is_not_found() {
        let response = app().oneshot(Request::get("/set-lang/fr/").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health() {
        let response = app().oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
