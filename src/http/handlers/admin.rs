//! Staff-only JSON API for the back office.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use validator::Validate;

use super::require_staff;
use crate::db::OrderFilter;
use crate::domain::aggregates::{Category, CustomerStats, LandingPage, NewCategory, NewLandingPage, NewProduct, Order, OrderSource, OrderStatus, Product};
use crate::domain::value_objects::{OrderId, ProductId, Slug};
use crate::export;
use crate::http::SharedState;
use crate::settings::SiteSettings;
use crate::{Result, ShopError};

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<String>,
    pub source: Option<String>,
}

impl OrderQuery {
    fn filter(&self) -> Result<OrderFilter> {
        Ok(OrderFilter {
            status: self.status.as_deref().filter(|s| !s.is_empty()).map(str::parse::<OrderStatus>).transpose()?,
            source: self.source.as_deref().filter(|s| !s.is_empty()).map(str::parse::<OrderSource>).transpose()?,
        })
    }
}

pub async fn list_orders(State(state): State<SharedState>, session: Session, Query(query): Query<OrderQuery>) -> Result<Json<Vec<Order>>> {
    require_staff(&state, &session).await?;
    Ok(Json(state.db.orders(query.filter()?).await?))
}

pub async fn get_order(State(state): State<SharedState>, session: Session, Path(id): Path<OrderId>) -> Result<Json<Order>> {
    require_staff(&state, &session).await?;
    state.db.order(id).await?.map(Json).ok_or(ShopError::OrderNotFound)
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub status: Option<OrderStatus>,
    pub tracking_number: Option<String>,
}

/// Edits status and tracking number; a newly assigned tracking number notifies the customer.
pub async fn update_order(
    State(state): State<SharedState>,
    session: Session,
    Path(id): Path<OrderId>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<Order>> {
    require_staff(&state, &session).await?;
    let order = state.orders.update_order(id, request.status, request.tracking_number.as_deref()).await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct MarkRequest {
    pub ids: Vec<OrderId>,
    pub status: OrderStatus,
}

#[derive(Serialize)]
pub struct MarkResponse {
    updated: u64,
}

/// Bulk status change; only `sent` and `done` are offered.
pub async fn mark_orders(State(state): State<SharedState>, session: Session, Json(request): Json<MarkRequest>) -> Result<Json<MarkResponse>> {
    require_staff(&state, &session).await?;
    if request.status == OrderStatus::New {
        return Err(ShopError::Validation("orders can only be marked sent or done".into()));
    }
    let updated = state.db.set_orders_status(&request.ids, request.status).await?;
    tracing::info!(updated, status = %request.status, "orders marked");
    Ok(Json(MarkResponse { updated }))
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub ids: Vec<OrderId>,
}

pub async fn export_orders(State(state): State<SharedState>, session: Session, Json(request): Json<ExportRequest>) -> Result<Response> {
    require_staff(&state, &session).await?;
    let orders = state.db.orders_by_ids(&request.ids).await?;
    let body = export::orders_csv(&orders)?;
    Ok((
        [
            (header::CONTENT_TYPE, export::CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", export::FILE_NAME)),
        ],
        body,
    )
        .into_response())
}

pub async fn list_categories(State(state): State<SharedState>, session: Session) -> Result<Json<Vec<Category>>> {
    require_staff(&state, &session).await?;
    Ok(Json(state.db.categories().await?))
}

pub async fn create_category(State(state): State<SharedState>, session: Session, Json(input): Json<NewCategory>) -> Result<(StatusCode, Json<Category>)> {
    require_staff(&state, &session).await?;
    input.validate()?;
    Ok((StatusCode::CREATED, Json(state.db.create_category(&input).await?)))
}

pub async fn create_product(State(state): State<SharedState>, session: Session, Json(input): Json<NewProduct>) -> Result<(StatusCode, Json<Product>)> {
    require_staff(&state, &session).await?;
    input.validate()?;
    let product = state.db.create_product(&input).await?;
    tracing::info!(product_id = product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(State(state): State<SharedState>, session: Session, Path(id): Path<ProductId>, Json(input): Json<NewProduct>) -> Result<Json<Product>> {
    require_staff(&state, &session).await?;
    input.validate()?;
    state.db.update_product(id, &input).await?.map(Json).ok_or(ShopError::ProductNotFound)
}

pub async fn deactivate_product(State(state): State<SharedState>, session: Session, Path(id): Path<ProductId>) -> Result<StatusCode> {
    require_staff(&state, &session).await?;
    if !state.db.deactivate_product(id).await? {
        return Err(ShopError::ProductNotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upsert_landing(State(state): State<SharedState>, session: Session, Path(slug): Path<String>, Json(input): Json<NewLandingPage>) -> Result<Json<LandingPage>> {
    require_staff(&state, &session).await?;
    let slug = Slug::new(slug)?;
    input.validate()?;
    Ok(Json(state.db.upsert_landing_page(&slug, &input).await?))
}

pub async fn get_settings(State(state): State<SharedState>, session: Session) -> Result<Json<SiteSettings>> {
    require_staff(&state, &session).await?;
    Ok(Json(state.db.site_settings().await?))
}

pub async fn put_settings(State(state): State<SharedState>, session: Session, Json(settings): Json<SiteSettings>) -> Result<Json<SiteSettings>> {
    require_staff(&state, &session).await?;
    state.db.save_site_settings(&settings).await?;
    Ok(Json(settings))
}

pub async fn customers(State(state): State<SharedState>, session: Session) -> Result<Json<Vec<CustomerStats>>> {
    require_staff(&state, &session).await?;
    Ok(Json(state.db.customer_stats().await?))
}
