//! Application services sitting between the HTTP/bot front-ends and storage.
pub mod checkout;

pub use checkout::{CheckoutOutcome, CheckoutRequest, NextStep, OrderService, OrderStore};
