use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use validator::Validate;

use super::current_account;
use crate::db::ProductFilter;
use crate::domain::aggregates::{Category, NewReview, Product, ProductImage, Review, TickerItem};
use crate::domain::value_objects::ProductId;
use crate::http::context::{FlashLevel, GlobalContext, View};
use crate::http::{session, SharedState};
use crate::{Result, ShopError};

const RELATED_LIMIT: i64 = 4;

#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

#[derive(Serialize)]
pub struct HomeView {
    products: Vec<Product>,
    categories: Vec<Category>,
    fav_ids: Vec<ProductId>,
    ticker_items: Vec<TickerItem>,
    q: Option<String>,
    category: Option<String>,
}

pub async fn home(State(state): State<SharedState>, session: Session, headers: HeaderMap, Query(query): Query<HomeQuery>) -> Result<Json<View<HomeView>>> {
    let filter = ProductFilter { query: query.q.clone(), category_slug: query.category.clone() };
    let products = state.db.products(&filter).await?;
    let categories = state.db.categories().await?;
    let favorites = session::favorites(&session).await?;
    let context = GlobalContext::load(&state, &session, &headers).await?;
    let ticker_items = if context.show_ticker { state.db.ticker_items().await? } else { Vec::new() };

    Ok(Json(View {
        context,
        data: HomeView { products, categories, fav_ids: favorites.ids().to_vec(), ticker_items, q: query.q, category: query.category },
    }))
}

#[derive(Serialize)]
pub struct ProductView {
    product: Product,
    images: Vec<ProductImage>,
    size_options: Vec<String>,
    color_options: Vec<String>,
    reviews: Vec<Review>,
    related_products: Vec<Product>,
    is_fav: bool,
}

pub async fn product_detail(State(state): State<SharedState>, session: Session, headers: HeaderMap, Path(id): Path<ProductId>) -> Result<Json<View<ProductView>>> {
    let product = state.db.product(id).await?.ok_or(ShopError::ProductNotFound)?;
    let images = state.db.product_images(id).await?;
    let reviews = state.db.reviews(id).await?;
    let related_products = state.db.related_products(&product, RELATED_LIMIT).await?;
    let is_fav = session::favorites(&session).await?.contains(id);
    let context = GlobalContext::load(&state, &session, &headers).await?;

    Ok(Json(View {
        context,
        data: ProductView {
            size_options: product.size_options().into_iter().map(String::from).collect(),
            color_options: product.color_options().into_iter().map(String::from).collect(),
            product,
            images,
            reviews,
            related_products,
            is_fav,
        },
    }))
}

/// Posts a review for an authenticated visitor; anonymous posts are ignored.
pub async fn post_review(State(state): State<SharedState>, session: Session, Path(id): Path<ProductId>, Form(input): Form<NewReview>) -> Result<Response> {
    let back = Redirect::to(&format!("/product/{id}/"));
    let Some(account) = current_account(&state, &session).await? else {
        return Ok(back.into_response());
    };
    state.db.product(id).await?.ok_or(ShopError::ProductNotFound)?;
    if let Err(errors) = input.validate() {
        session::flash(&session, FlashLevel::Error, ShopError::from(errors).to_string()).await?;
        return Ok(back.into_response());
    }
    let review = state.db.create_review(id, account.id, &input).await?;
    tracing::info!(review_id = review.id, product_id = id, "review posted");
    Ok(back.into_response())
}

#[derive(Serialize)]
pub struct ModalView {
    product: Product,
    size_options: Vec<String>,
    color_options: Vec<String>,
    is_on_sale: bool,
}

/// Compact product data for the quick-view modal.
pub async fn product_modal(State(state): State<SharedState>, Path(id): Path<ProductId>) -> Result<Json<ModalView>> {
    let product = state.db.product(id).await?.ok_or(ShopError::ProductNotFound)?;
    Ok(Json(ModalView {
        size_options: product.size_options().into_iter().map(String::from).collect(),
        color_options: product.color_options().into_iter().map(String::from).collect(),
        is_on_sale: product.is_on_sale(),
        product,
    }))
}
