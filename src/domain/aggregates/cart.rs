//! Cart Aggregate
//!
//! A cart maps product ids to positive quantities. It lives in the visitor's
//! session (or in the bot's per-chat store) and only becomes rows in the
//! database when it is snapshotted into an order.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::{Money, ProductId};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SessionCart", into = "SessionCart")]
pub struct Cart {
    items: BTreeMap<ProductId, u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CartAction {
    Increase,
    Decrease,
}

impl std::str::FromStr for CartAction {
    type Err = CartError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" | "increase" => Ok(Self::Increase),
            "subtract" | "decrease" => Ok(Self::Decrease),
            other => Err(CartError::UnknownAction(other.to_string())),
        }
    }
}

impl Cart {
    pub fn new() -> Self { Self::default() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn quantity(&self, product_id: ProductId) -> u32 { self.items.get(&product_id).copied().unwrap_or(0) }
    pub fn product_ids(&self) -> Vec<ProductId> { self.items.keys().copied().collect() }
    pub fn entries(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ { self.items.iter().map(|(id, qty)| (*id, *qty)) }

    /// Total number of units, shown as the cart badge.
    pub fn count(&self) -> u32 { self.items.values().sum() }

    pub fn add(&mut self, product_id: ProductId) {
        *self.items.entry(product_id).or_insert(0) += 1;
    }

    pub fn update(&mut self, product_id: ProductId, action: CartAction) {
        match action {
            CartAction::Increase => self.add(product_id),
            CartAction::Decrease => {
                if let Some(qty) = self.items.get_mut(&product_id) {
                    *qty = qty.saturating_sub(1);
                    if *qty == 0 { self.items.remove(&product_id); }
                }
            }
        }
    }

    pub fn clear(&mut self) { self.items.clear(); }

    /// Prices every entry against `catalog`.
    ///
    /// Entries whose product is missing from `catalog` are dropped from the
    /// snapshot; the cart itself is left untouched.
    pub fn snapshot(&self, catalog: &HashMap<ProductId, Product>) -> CartSnapshot {
        let mut lines = Vec::with_capacity(self.items.len());
        for (product_id, quantity) in self.entries() {
            match catalog.get(&product_id) {
                Some(product) => lines.push(CartLine {
                    product: product.clone(),
                    unit_price: product.price,
                    quantity,
                    line_total: product.price.multiply(quantity),
                }),
                None => tracing::debug!(product_id, quantity, "cart entry no longer resolves, skipping"),
            }
        }
        let total = lines.iter().map(|l| l.line_total).sum();
        CartSnapshot { lines, total }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product: Product,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    pub total: Money,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
}

/// Wire form of the cart as stored in the session: `{"<product id>": quantity}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct SessionCart(BTreeMap<String, i64>);

impl From<SessionCart> for Cart {
    fn from(raw: SessionCart) -> Self {
        let mut items = BTreeMap::new();
        for (key, qty) in raw.0 {
            match (key.parse::<ProductId>(), u32::try_from(qty)) {
                (Ok(id), Ok(qty)) if qty > 0 => { items.insert(id, qty); }
                _ => tracing::warn!(key = %key, qty, "dropping invalid session cart entry"),
            }
        }
        Self { items }
    }
}

impl From<Cart> for SessionCart {
    fn from(cart: Cart) -> Self {
        SessionCart(cart.items.into_iter().map(|(id, qty)| (id.to_string(), i64::from(qty))).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("unknown cart action: {0}")]
    UnknownAction(String),
}
