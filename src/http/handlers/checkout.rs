use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use validator::Validate;

use crate::domain::aggregates::{Customer, Delivery, Order, OrderError, PaymentMethod};
use crate::domain::value_objects::OrderId;
use crate::http::context::{FlashLevel, GlobalContext, View};
use crate::http::{session, SharedState};
use crate::payment::PaymentPage;
use crate::services::{CheckoutRequest, NextStep};
use crate::{Result, ShopError};

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CheckoutForm {
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub last_name: String,
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
    pub city_name: Option<String>,
    pub city: Option<String>,
    #[serde(default)]
    pub city_ref: String,
    pub warehouse_name: Option<String>,
    pub nova_poshta: Option<String>,
    #[serde(default)]
    pub warehouse_ref: String,
    pub payment: Option<String>,
}

impl CheckoutForm {
    /// Picks the carrier widget's names over the plain inputs, falling back to `Unknown`.
    pub fn into_request(self) -> Result<CheckoutRequest> {
        let payment_method = match self.payment.as_deref().filter(|p| !p.is_empty()) {
            Some(raw) => raw.parse::<PaymentMethod>()?,
            None => PaymentMethod::default(),
        };
        Ok(CheckoutRequest {
            customer: Customer { first_name: self.first_name.trim().to_string(), last_name: self.last_name.trim().to_string(), phone: self.phone.trim().to_string() },
            delivery: Delivery {
                city: first_filled([self.city_name, self.city]),
                city_ref: self.city_ref,
                branch: first_filled([self.warehouse_name, self.nova_poshta]),
                branch_ref: self.warehouse_ref,
            },
            payment_method,
        })
    }
}

fn first_filled(candidates: [Option<String>; 2]) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

#[derive(Serialize)]
pub struct SuccessView {
    order: Order,
}

pub async fn checkout_redirect() -> Redirect {
    Redirect::to("/cart/")
}

pub async fn checkout(State(state): State<SharedState>, session: Session, headers: HeaderMap, Form(form): Form<CheckoutForm>) -> Result<Response> {
    let mut cart = session::cart(&session).await?;
    if cart.is_empty() {
        return Ok(Redirect::to("/").into_response());
    }
    if let Err(errors) = form.validate() {
        session::flash(&session, FlashLevel::Error, ShopError::from(errors).to_string()).await?;
        return Ok(Redirect::to("/cart/").into_response());
    }
    let request = form.into_request()?;
    let current = session::account_id(&session).await?;

    let outcome = match state.orders.checkout(&mut cart, request, current).await {
        Ok(outcome) => {
            session::save_cart(&session, &cart).await?;
            outcome
        }
        Err(ShopError::Order(OrderError::NoItems)) => {
            session::save_cart(&session, &cart).await?;
            session::flash(&session, FlashLevel::Error, "Товари з кошика більше недоступні").await?;
            return Ok(Redirect::to("/").into_response());
        }
        Err(err) => return Err(err),
    };

    if let Some(username) = &outcome.provisioned_username {
        session::flash(&session, FlashLevel::Info, format!("Акаунт створено! Логін: {username}")).await?;
    }
    match outcome.next {
        NextStep::Payment(order_id) => Ok(Redirect::to(&format!("/pay/{order_id}/")).into_response()),
        NextStep::Confirmation => {
            let context = GlobalContext::load(&state, &session, &headers).await?;
            Ok(Json(View { context, data: SuccessView { order: outcome.order } }).into_response())
        }
    }
}

pub async fn payment(State(state): State<SharedState>, Path(order_id): Path<OrderId>) -> Result<Json<PaymentPage>> {
    let order = state.db.order(order_id).await?.ok_or(ShopError::OrderNotFound)?;
    let settings = state.db.site_settings().await?;
    Ok(Json(PaymentPage::for_order(&order, &settings)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> CheckoutForm {
        CheckoutForm { first_name: "Olena".into(), phone: "+380501234567".into(), ..CheckoutForm::default() }
    }

    #[test]
    fn test_delivery_defaults() {
        let request = form().into_request().unwrap();
        assert_eq!(request.delivery.city, "Unknown");
        assert_eq!(request.delivery.branch, "Unknown");
        assert_eq!(request.payment_method, PaymentMethod::CashOnDelivery);
    }

    #[test]
    fn test_widget_names_win() {
        let request = CheckoutForm {
            city_name: Some("Київ".into()),
            city: Some("Kyiv".into()),
            warehouse_name: Some(" ".into()),
            nova_poshta: Some("Відділення №5".into()),
            payment: Some("liqpay".into()),
            ..form()
        }
        .into_request()
        .unwrap();
        assert_eq!(request.delivery.city, "Київ");
        assert_eq!(request.delivery.branch, "Відділення №5");
        assert_eq!(request.payment_method, PaymentMethod::LiqPay);
    }

    #[test]
    fn test_form_validation() {
        assert!(form().validate().is_ok());
        assert!(CheckoutForm { phone: String::new(), ..form() }.validate().is_err());
        assert!(CheckoutForm { payment: Some("bitcoin".into()), ..form() }.into_request().is_err());
    }
}
