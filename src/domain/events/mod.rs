//! Domain events
use crate::domain::value_objects::{AccountId, Money, OrderId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainEvent {
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderEvent {
    Placed { order_id: OrderId, total: Money, phone: String, city: String, branch: String },
    TrackingAssigned { order_id: OrderId, account_id: Option<AccountId>, tracking_number: String },
}
