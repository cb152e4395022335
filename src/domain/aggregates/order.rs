//! Order Aggregate

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::cart::CartSnapshot;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{AccountId, Money, OrderId, ProductId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] New, Sent, Done }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    WayForPay,
    LiqPay,
    #[default]
    #[serde(rename = "cod")]
    CashOnDelivery,
    Cash,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSource { #[default] Site, Bot }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::New => "new", Self::Sent => "sent", Self::Done => "done" }
    }
    pub fn display_name(&self) -> &'static str {
        match self { Self::New => "Новий", Self::Sent => "Відправлено", Self::Done => "Виконано" }
    }
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::WayForPay => "wayforpay", Self::LiqPay => "liqpay", Self::CashOnDelivery => "cod", Self::Cash => "cash" }
    }
    /// Gateway methods hand the visitor off to a payment page after checkout.
    pub fn is_gateway(&self) -> bool { matches!(self, Self::WayForPay | Self::LiqPay) }
}

impl OrderSource {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Site => "site", Self::Bot => "bot" }
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "sent" => Ok(Self::Sent),
            "done" => Ok(Self::Done),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wayforpay" => Ok(Self::WayForPay),
            "liqpay" => Ok(Self::LiqPay),
            "cod" => Ok(Self::CashOnDelivery),
            "cash" => Ok(Self::Cash),
            other => Err(OrderError::UnknownPaymentMethod(other.to_string())),
        }
    }
}

impl FromStr for OrderSource {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "site" => Ok(Self::Site),
            "bot" => Ok(Self::Bot),
            other => Err(OrderError::UnknownSource(other.to_string())),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer { pub first_name: String, pub last_name: String, pub phone: String }

impl Customer {
    /// Width of the stored first name column.
    pub const FIRST_NAME_MAX: usize = 50;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery { pub city: String, pub city_ref: String, pub branch: String, pub branch_ref: String }

impl Delivery {
    /// The bot channel has no carrier integration, so its orders carry fixed placeholders.
    pub fn bot_placeholder() -> Self {
        Self { city: "Bot".into(), city_ref: String::new(), branch: "-".into(), branch_ref: String::new() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrderItem { pub product_id: ProductId, pub price: Money, pub quantity: u32 }

/// An order ready to be written to the ledger; its total is fixed here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrder {
    pub account_id: Option<AccountId>,
    pub customer: Customer,
    pub delivery: Delivery,
    pub payment_method: PaymentMethod,
    pub source: OrderSource,
    pub items: Vec<NewOrderItem>,
    pub total: Money,
}

impl NewOrder {
    pub fn from_snapshot(
        snapshot: &CartSnapshot,
        account_id: Option<AccountId>,
        customer: Customer,
        delivery: Delivery,
        payment_method: PaymentMethod,
        source: OrderSource,
    ) -> Result<Self, OrderError> {
        if snapshot.is_empty() { return Err(OrderError::NoItems); }
        let items = snapshot.lines.iter()
            .map(|l| NewOrderItem { product_id: l.product.id, price: l.unit_price, quantity: l.quantity })
            .collect();
        Ok(Self { account_id, customer, delivery, payment_method, source, items, total: snapshot.total })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Money,
    pub quantity: u32,
}

impl OrderItem {
    pub fn line_total(&self) -> Money { self.price.multiply(self.quantity) }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: Option<AccountId>,
    pub customer: Customer,
    pub delivery: Delivery,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub tracking_number: String,
    pub total_price: Money,
    pub source: OrderSource,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.customer.first_name, self.customer.last_name).trim().to_string()
    }

    pub fn placed_event(&self) -> DomainEvent {
        DomainEvent::Order(OrderEvent::Placed {
            order_id: self.id,
            total: self.total_price,
            phone: self.customer.phone.clone(),
            city: self.delivery.city.clone(),
            branch: self.delivery.branch.clone(),
        })
    }

    /// Stores a new tracking number.
    ///
    /// Returns an event only when the new value is non-empty and differs from the
    /// stored one; clearing the number or re-saving the same one is silent.
    pub fn set_tracking_number(&mut self, tracking_number: &str) -> Option<DomainEvent> {
        let tracking_number = tracking_number.trim();
        if tracking_number == self.tracking_number { return None; }
        self.tracking_number = tracking_number.to_string();
        if tracking_number.is_empty() { return None; }
        Some(DomainEvent::Order(OrderEvent::TrackingAssigned {
            order_id: self.id,
            account_id: self.account_id,
            tracking_number: self.tracking_number.clone(),
        }))
    }

    pub fn set_status(&mut self, status: OrderStatus) { self.status = status; }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("order has no items")]
    NoItems,
    #[error("unknown order status: {0}")]
    UnknownStatus(String),
    #[error("unknown payment method: {0}")]
    UnknownPaymentMethod(String),
    #[error("unknown order source: {0}")]
    UnknownSource(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::cart::Cart;
    use crate::domain::aggregates::product::Product;
    use std::collections::HashMap;

    fn product(id: ProductId, price: i64) -> Product {
        Product {
            id, category_id: 1, name: format!("P{id}"), description: String::new(), price: Money::from_units(price),
            old_price: None, image: None, sizes: String::new(), colors: String::new(), is_active: true, created_at: Utc::now(),
        }
    }

    fn order(tracking: &str) -> Order {
        Order {
            id: 42, account_id: Some(7), customer: Customer::default(), delivery: Delivery::default(),
            payment_method: PaymentMethod::Cash, status: OrderStatus::New, tracking_number: tracking.into(),
            total_price: Money::from_units(100), source: OrderSource::Site, created_at: Utc::now(), items: vec![],
        }
    }

    #[test]
    fn test_new_order_total_is_snapshot() {
        let mut cart = Cart::new();
        cart.add(5);
        cart.add(5);
        cart.add(7);
        let mut catalog: HashMap<_, _> = [(5, product(5, 500)), (7, product(7, 300))].into_iter().collect();
        let snapshot = cart.snapshot(&catalog);
        let new_order = NewOrder::from_snapshot(&snapshot, None, Customer::default(), Delivery::default(), PaymentMethod::default(), OrderSource::Site).unwrap();
        assert_eq!(new_order.total, Money::from_units(1300));
        assert_eq!(new_order.items.iter().map(|i| i.quantity).collect::<Vec<_>>(), vec![2, 1]);

        if let Some(p) = catalog.get_mut(&5) { p.price = Money::from_units(9000); }
        assert_eq!(new_order.total, Money::from_units(1300));
        assert_eq!(new_order.items[0].price, Money::from_units(500));
    }

    #[test]
    fn test_empty_snapshot_is_rejected() {
        let snapshot = Cart::new().snapshot(&HashMap::new());
        let result = NewOrder::from_snapshot(&snapshot, None, Customer::default(), Delivery::default(), PaymentMethod::Cash, OrderSource::Bot);
        assert_eq!(result, Err(OrderError::NoItems));
    }

    #[test]
    fn test_tracking_transitions() {
        let mut o = order("");
        assert!(o.set_tracking_number("").is_none());
        assert!(matches!(
            o.set_tracking_number("20450000000000"),
            Some(DomainEvent::Order(OrderEvent::TrackingAssigned { order_id: 42, account_id: Some(7), .. }))
        ));
        assert!(o.set_tracking_number("20450000000000").is_none(), "same value does not notify");
        assert!(o.set_tracking_number("20450000000001").is_some(), "changed value notifies");
        assert!(o.set_tracking_number("  ").is_none(), "clearing does not notify");
        assert_eq!(o.tracking_number, "");
    }

    #[test]
    fn test_wire_names() {
        assert_eq!("cod".parse::<PaymentMethod>().unwrap(), PaymentMethod::CashOnDelivery);
        assert!(PaymentMethod::LiqPay.is_gateway());
        assert!(!PaymentMethod::Cash.is_gateway());
        assert_eq!(serde_json::to_string(&PaymentMethod::WayForPay).unwrap(), "\"wayforpay\"");
        assert_eq!(serde_json::to_string(&PaymentMethod::CashOnDelivery).unwrap(), "\"cod\"");
        assert_eq!(OrderStatus::Sent.display_name(), "Відправлено");
        assert!("lost".parse::<OrderStatus>().is_err());
    }
}
