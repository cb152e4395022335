//! HTTP front-end.
//!
//! Storefront views return JSON view models carrying the global context; the
//! landing pages are served as rendered HTML. Mutating storefront routes answer
//! with redirects, the way a form-driven site does.

mod context;
mod error;
mod handlers;
mod session;

pub use context::{Flash, FlashLevel, GlobalContext};
pub use session::SESSION_INACTIVITY_DAYS;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::db::Db;
use crate::services::OrderService;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub orders: OrderService,
}

impl AppState {
    pub fn new(db: Db, orders: OrderService) -> Self { Self { db, orders } }
}

pub fn router(state: AppState) -> Router {
    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(SESSION_INACTIVITY_DAYS)));

    let storefront = Router::new()
        .route("/", get(handlers::store::home))
        .route("/product/:id/", get(handlers::store::product_detail).post(handlers::store::post_review))
        .route("/modal/:id/", get(handlers::store::product_modal))
        .route("/add/:id/", get(handlers::cart::add))
        .route("/update_cart/:id/", post(handlers::cart::update))
        .route("/cart/", get(handlers::cart::view))
        .route("/clear/", get(handlers::cart::clear))
        .route("/fav/toggle/:id/", get(handlers::cart::toggle_favorite))
        .route("/favorites/", get(handlers::cart::favorites))
        .route("/checkout/", get(handlers::checkout::checkout_redirect).post(handlers::checkout::checkout))
        .route("/pay/:order_id/", get(handlers::checkout::payment))
        .route("/page/:slug/", get(handlers::pages::landing))
        .route("/auth/", get(handlers::account::auth_page).post(handlers::account::auth))
        .route("/logout/", get(handlers::account::logout))
        .route("/profile/", get(handlers::account::profile))
        .route("/set-lang/:lang/", get(handlers::pages::set_language))
        .route("/sitemap.xml", get(handlers::pages::sitemap));

    let admin = Router::new()
        .route("/orders", get(handlers::admin::list_orders))
        .route("/orders/mark", post(handlers::admin::mark_orders))
        .route("/orders/export", post(handlers::admin::export_orders))
        .route("/orders/:id", get(handlers::admin::get_order).put(handlers::admin::update_order))
        .route("/categories", get(handlers::admin::list_categories).post(handlers::admin::create_category))
        .route("/products", post(handlers::admin::create_product))
        .route("/products/:id", put(handlers::admin::update_product).delete(handlers::admin::deactivate_product))
        .route("/landing/:slug", put(handlers::admin::upsert_landing))
        .route("/settings", get(handlers::admin::get_settings).put(handlers::admin::put_settings))
        .route("/customers", get(handlers::admin::customers));

    Router::new()
        .route("/health", get(handlers::pages::health))
        .merge(storefront)
        .nest("/admin", admin)
        .layer(sessions)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub type SharedState = Arc<AppState>;
