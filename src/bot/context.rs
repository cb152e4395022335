use std::sync::Arc;

use super::carts::BotCartStore;
use crate::db::Db;
use crate::services::OrderService;

#[derive(Clone)]
pub struct AppContext {
    db: Db,
    orders: OrderService,
    carts: Arc<dyn BotCartStore>,
}

impl AppContext {
    pub fn new(db: Db, orders: OrderService, carts: Arc<dyn BotCartStore>) -> Self { Self { db, orders, carts } }
    pub fn db(&self) -> &Db { &self.db }
    pub fn orders(&self) -> &OrderService { &self.orders }
    pub fn carts(&self) -> &dyn BotCartStore { self.carts.as_ref() }
}
