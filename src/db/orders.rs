use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::instrument;

use super::Db;
use crate::domain::aggregates::{Account, Customer, Delivery, NewAccount, NewOrder, Order, OrderItem, OrderSource, OrderStatus, Product};
use crate::domain::value_objects::{AccountId, Money, OrderId, ProductId};
use crate::services::OrderStore;
use crate::settings::SiteSettings;
use crate::{Result, ShopError};

const ORDER_COLUMNS: &str = "id, account_id, first_name, last_name, phone, city, city_ref, nova_poshta, warehouse_ref, \
                             payment_method, status, tracking_number, total_price, source, created_at";

/// Admin list filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub source: Option<OrderSource>,
}

#[derive(FromRow)]
struct OrderRow {
    id: i64,
    account_id: Option<i64>,
    first_name: String,
    last_name: String,
    phone: String,
    city: String,
    city_ref: String,
    nova_poshta: String,
    warehouse_ref: String,
    payment_method: String,
    status: String,
    tracking_number: String,
    total_price: Decimal,
    source: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order> {
        Ok(Order {
            id: self.id,
            account_id: self.account_id,
            customer: Customer { first_name: self.first_name, last_name: self.last_name, phone: self.phone },
            delivery: Delivery { city: self.city, city_ref: self.city_ref, branch: self.nova_poshta, branch_ref: self.warehouse_ref },
            payment_method: self.payment_method.parse()?,
            status: self.status.parse()?,
            tracking_number: self.tracking_number,
            total_price: Money::new(self.total_price)?,
            source: self.source.parse()?,
            created_at: self.created_at,
            items,
        })
    }
}

#[derive(FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    product_name: String,
    price: Decimal,
    quantity: i32,
}

impl OrderItemRow {
    fn into_item(self) -> Result<OrderItem> {
        Ok(OrderItem {
            id: self.id,
            order_id: self.order_id,
            product_id: self.product_id,
            product_name: self.product_name,
            price: Money::new(self.price)?,
            quantity: u32::try_from(self.quantity).unwrap_or_default(),
        })
    }
}

impl Db {
    /// Writes the order header and every line in one transaction.
    #[instrument(skip(self, order), fields(items = order.items.len(), total = %order.total))]
    pub async fn insert_order(&self, order: NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO orders (account_id, first_name, last_name, phone, city, city_ref, nova_poshta, warehouse_ref, payment_method, total_price, source) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING id",
        )
        .bind(order.account_id)
        .bind(&order.customer.first_name)
        .bind(&order.customer.last_name)
        .bind(&order.customer.phone)
        .bind(&order.delivery.city)
        .bind(&order.delivery.city_ref)
        .bind(&order.delivery.branch)
        .bind(&order.delivery.branch_ref)
        .bind(order.payment_method.as_str())
        .bind(order.total.amount())
        .bind(order.source.as_str())
        .fetch_one(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query("INSERT INTO order_items (order_id, product_id, price, quantity) VALUES ($1, $2, $3, $4)")
                .bind(id)
                .bind(item.product_id)
                .bind(item.price.amount())
                .bind(i32::try_from(item.quantity).map_err(|_| ShopError::Validation("quantity out of range".into()))?)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        self.order(id).await?.ok_or(ShopError::OrderNotFound)
    }

    #[instrument(skip(self))]
    pub async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query_as::<Postgres, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Orders newest first.
    #[instrument(skip(self))]
    pub async fn orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE TRUE"));
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(source) = filter.source {
            qb.push(" AND source = ").push_bind(source.as_str());
        }
        qb.push(" ORDER BY created_at DESC, id DESC");
        let rows = qb.build_query_as::<OrderRow>().fetch_all(&self.pool).await?;
        self.with_items(rows).await
    }

    #[instrument(skip(self))]
    pub async fn orders_for_account(&self, account_id: AccountId) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<Postgres, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE account_id = $1 ORDER BY created_at DESC, id DESC"))
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;
        self.with_items(rows).await
    }

    #[instrument(skip(self))]
    pub async fn orders_by_ids(&self, ids: &[OrderId]) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<Postgres, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ANY($1) ORDER BY id"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        self.with_items(rows).await
    }

    #[instrument(skip(self, order), fields(order_id = order.id))]
    pub async fn save_order_state(&self, order: &Order) -> Result<()> {
        sqlx::query("UPDATE orders SET status = $2, tracking_number = $3 WHERE id = $1")
            .bind(order.id)
            .bind(order.status.as_str())
            .bind(&order.tracking_number)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Bulk status change; returns how many orders were updated.
    #[instrument(skip(self))]
    pub async fn set_orders_status(&self, ids: &[OrderId], status: OrderStatus) -> Result<u64> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = ANY($1)")
            .bind(ids)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
        if rows.is_empty() { return Ok(Vec::new()); }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<Postgres, OrderItemRow>(
            "SELECT i.id, i.order_id, i.product_id, p.name AS product_name, i.price, i.quantity \
             FROM order_items i JOIN products p ON p.id = i.product_id WHERE i.order_id = ANY($1) ORDER BY i.id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let item = row.into_item()?;
            items.entry(item.order_id).or_default().push(item);
        }
        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for Db {
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>> { Db::products_by_ids(self, ids).await }
    async fn account_by_phone(&self, phone: &str) -> Result<Option<Account>> { Db::account_by_phone(self, phone).await }
    async fn create_account(&self, account: NewAccount) -> Result<Account> { Db::create_account(self, account).await }
    async fn insert_order(&self, order: NewOrder) -> Result<Order> { Db::insert_order(self, order).await }
    async fn order(&self, id: OrderId) -> Result<Option<Order>> { Db::order(self, id).await }
    async fn save_order_state(&self, order: &Order) -> Result<()> { Db::save_order_state(self, order).await }
    async fn chat_for_account(&self, account_id: AccountId) -> Result<Option<i64>> { Db::chat_for_account(self, account_id).await }
    async fn site_settings(&self) -> Result<SiteSettings> { Db::site_settings(self).await }
}
