use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Redirect;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::domain::aggregates::{CartAction, CartLine, Product};
use crate::domain::value_objects::{Money, ProductId};
use crate::http::context::{FlashLevel, GlobalContext, View};
use crate::http::session::{self, back_or_home};
use crate::http::SharedState;
use crate::Result;

pub async fn add(session: Session, headers: HeaderMap, Path(id): Path<ProductId>) -> Result<Redirect> {
    let mut cart = session::cart(&session).await?;
    cart.add(id);
    session::save_cart(&session, &cart).await?;
    session::flash(&session, FlashLevel::Success, "Додано!").await?;
    Ok(Redirect::to(&back_or_home(&headers)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub action: String,
}

/// Applies `add` / `subtract`; anything else leaves the cart alone.
pub async fn update(session: Session, Path(id): Path<ProductId>, Form(form): Form<UpdateForm>) -> Result<Redirect> {
    match form.action.parse::<CartAction>() {
        Ok(action) => {
            let mut cart = session::cart(&session).await?;
            cart.update(id, action);
            session::save_cart(&session, &cart).await?;
        }
        Err(err) => tracing::debug!(product_id = id, error = %err, "ignoring cart update"),
    }
    Ok(Redirect::to("/cart/"))
}

#[derive(Serialize)]
pub struct CartView {
    cart_items: Vec<CartLine>,
    total_price: Money,
    np_key: String,
}

pub async fn view(State(state): State<SharedState>, session: Session, headers: HeaderMap) -> Result<Json<View<CartView>>> {
    let cart = session::cart(&session).await?;
    let catalog = state.db.products_by_ids(&cart.product_ids()).await?;
    let snapshot = cart.snapshot(&catalog);
    let settings = state.db.site_settings().await?;
    let context = GlobalContext::load(&state, &session, &headers).await?;
    Ok(Json(View {
        context,
        data: CartView { cart_items: snapshot.lines, total_price: snapshot.total, np_key: settings.nova_poshta_api_key },
    }))
}

pub async fn clear(session: Session) -> Result<Redirect> {
    let mut cart = session::cart(&session).await?;
    cart.clear();
    session::save_cart(&session, &cart).await?;
    Ok(Redirect::to("/cart/"))
}

pub async fn toggle_favorite(session: Session, headers: HeaderMap, Path(id): Path<ProductId>) -> Result<Redirect> {
    let mut favorites = session::favorites(&session).await?;
    favorites.toggle(id);
    session::save_favorites(&session, &favorites).await?;
    Ok(Redirect::to(&back_or_home(&headers)))
}

#[derive(Serialize)]
pub struct FavoritesView {
    products: Vec<Product>,
}

/// Starred products in the order they were added; ones that no longer exist are skipped.
pub async fn favorites(State(state): State<SharedState>, session: Session, headers: HeaderMap) -> Result<Json<View<FavoritesView>>> {
    let favorites = session::favorites(&session).await?;
    let mut catalog = state.db.products_by_ids(favorites.ids()).await?;
    let products = favorites.ids().iter().filter_map(|id| catalog.remove(id)).collect();
    let context = GlobalContext::load(&state, &session, &headers).await?;
    Ok(Json(View { context, data: FavoritesView { products } }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    fn app() -> Router {
        Router::new()
            .route("/update_cart/:id/", post(super::update))
            .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
    }

    fn update_request(action: &str) -> Request<Body> {
        Request::post("/update_cart/5/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("action={action}")))
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_action_redirects_to_cart() {
        let response = app().oneshot(update_request("explode")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/cart/");
    }

    #[tokio::test]
    async fn test_known_action_redirects_to_cart() {
        let response = app().oneshot(update_request("subtract")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/cart/");
    }
}
