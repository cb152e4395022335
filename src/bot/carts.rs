//! Per-chat carts for the bot channel.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::aggregates::Cart;
use crate::domain::value_objects::ProductId;

/// Cart storage keyed by Telegram user id.
///
/// Each call is one read-modify-write, so concurrent updates for the same chat
/// never lose an increment.
#[cfg_attr(test, mockall::automock)]
pub trait BotCartStore: Send + Sync {
    /// Adds one unit and returns the new quantity of that product.
    fn add(&self, chat_id: i64, product_id: ProductId) -> u32;
    fn cart(&self, chat_id: i64) -> Cart;
    fn clear(&self, chat_id: i64);
}

#[derive(Debug, Default)]
pub struct InMemoryBotCarts {
    carts: Mutex<HashMap<i64, Cart>>,
}

impl InMemoryBotCarts {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Cart>> {
        self.carts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BotCartStore for InMemoryBotCarts {
    fn add(&self, chat_id: i64, product_id: ProductId) -> u32 {
        let mut carts = self.lock();
        let cart = carts.entry(chat_id).or_default();
        cart.add(product_id);
        cart.quantity(product_id)
    }

    fn cart(&self, chat_id: i64) -> Cart {
        self.lock().get(&chat_id).cloned().unwrap_or_default()
    }

    fn clear(&self, chat_id: i64) {
        self.lock().remove(&chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_carts_are_per_chat() {
        let store = InMemoryBotCarts::new();
        assert_eq!(store.add(1, 5), 1);
        assert_eq!(store.add(1, 5), 2);
        store.add(2, 7);
        assert_eq!(store.cart(1).quantity(5), 2);
        assert_eq!(store.cart(2).count(), 1);
        store.clear(1);
        assert!(store.cart(1).is_empty());
        assert_eq!(store.cart(2).count(), 1);
    }

    #[test]
    fn test_concurrent_adds_are_not_lost() {
        let store = Arc::new(InMemoryBotCarts::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || for _ in 0..100 { store.add(9, 3); })
            })
            .collect();
        for handle in handles { handle.join().unwrap(); }
        assert_eq!(store.cart(9).quantity(3), 800);
    }
}
