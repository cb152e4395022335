//! Checkout and order lifecycle.
//!
//! Both sales channels turn a cart into an order through [`OrderService`]:
//! the cart is priced against the current catalog, the order and its lines are
//! written in one transaction, the cart is cleared and the admin chat is
//! notified. Admin edits of the tracking number go through the same service so
//! the customer notification fires from a single place.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::domain::aggregates::customer::generate_password;
use crate::domain::aggregates::{
    Account, Cart, Customer, Delivery, NewAccount, NewOrder, Order, OrderError, OrderSource, OrderStatus, PaymentMethod, Product, TelegramUser,
};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{AccountId, OrderId, Phone, ProductId};
use crate::notify::NotificationDispatcher;
use crate::settings::SiteSettings;
use crate::{Result, ShopError};

/// Persistence needed by the order lifecycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Products with the given ids; missing ids are simply absent from the map.
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>>;
    async fn account_by_phone(&self, phone: &str) -> Result<Option<Account>>;
    async fn create_account(&self, account: NewAccount) -> Result<Account>;
    /// Writes the order and its items atomically.
    async fn insert_order(&self, order: NewOrder) -> Result<Order>;
    async fn order(&self, id: OrderId) -> Result<Option<Order>>;
    /// Persists status and tracking number.
    async fn save_order_state(&self, order: &Order) -> Result<()>;
    async fn chat_for_account(&self, account_id: AccountId) -> Result<Option<i64>>;
    async fn site_settings(&self) -> Result<SiteSettings>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub customer: Customer,
    pub delivery: Delivery,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// Hand the visitor off to the gateway page for this order.
    Payment(OrderId),
    Confirmation,
}

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    /// Username of an account created for this checkout.
    pub provisioned_username: Option<String>,
    pub next: NextStep,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    dispatcher: NotificationDispatcher,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, dispatcher: NotificationDispatcher) -> Self { Self { store, dispatcher } }

    /// Web checkout. The cart is cleared once the order is written, whatever the
    /// payment method; it is also cleared when none of its products still exist.
    /// A failed insert leaves the cart as it was.
    #[instrument(skip(self, cart, request), fields(items = cart.count()))]
    pub async fn checkout(&self, cart: &mut Cart, request: CheckoutRequest, current_account: Option<AccountId>) -> Result<CheckoutOutcome> {
        if cart.is_empty() { return Err(ShopError::EmptyCart); }

        let (account_id, provisioned_username) = match current_account {
            Some(id) => (id, None),
            None => {
                let (account, provisioned) = self.resolve_account(&request.customer.phone, &request.customer.first_name).await?;
                (account.id, provisioned.then_some(account.username))
            }
        };

        let catalog = self.store.products_by_ids(&cart.product_ids()).await?;
        let snapshot = cart.snapshot(&catalog);
        let new_order = NewOrder::from_snapshot(&snapshot, Some(account_id), request.customer, request.delivery, request.payment_method, OrderSource::Site);
        let order = self.place(cart, new_order).await?;

        let next = if order.payment_method.is_gateway() { NextStep::Payment(order.id) } else { NextStep::Confirmation };
        Ok(CheckoutOutcome { order, provisioned_username, next })
    }

    /// Bot checkout: fixed placeholder delivery, phone from the chat identity.
    #[instrument(skip(self, cart, user), fields(telegram_id = user.telegram_id))]
    pub async fn bot_checkout(&self, cart: &mut Cart, user: &TelegramUser) -> Result<Order> {
        if cart.is_empty() { return Err(ShopError::EmptyCart); }
        let phone = if user.phone_number.is_empty() { "TG".to_string() } else { user.phone_number.clone() };
        let first_name = user.first_name.chars().take(Customer::FIRST_NAME_MAX).collect();
        let customer = Customer { first_name, last_name: String::new(), phone };

        let catalog = self.store.products_by_ids(&cart.product_ids()).await?;
        let snapshot = cart.snapshot(&catalog);
        let new_order = NewOrder::from_snapshot(&snapshot, user.account_id, customer, Delivery::bot_placeholder(), PaymentMethod::default(), OrderSource::Bot);
        self.place(cart, new_order).await
    }

    /// Finds the account owning `phone`, creating one with a throwaway password if none does.
    /// The flag is true when the account was just created.
    pub async fn resolve_account(&self, phone: &str, first_name: &str) -> Result<(Account, bool)> {
        let phone = Phone::new(phone)?;
        if let Some(account) = self.store.account_by_phone(phone.as_str()).await? {
            return Ok((account, false));
        }
        let new_account = NewAccount::new(phone.as_username(), &generate_password(), first_name, Some(phone.to_string()));
        let account = self.store.create_account(new_account).await?;
        info!(account_id = account.id, username = %account.username, "provisioned account for phone");
        Ok((account, true))
    }

    /// Admin edit of an order's status and tracking number.
    #[instrument(skip(self))]
    pub async fn update_order(&self, id: OrderId, status: Option<OrderStatus>, tracking_number: Option<&str>) -> Result<Order> {
        let mut order = self.store.order(id).await?.ok_or(ShopError::OrderNotFound)?;
        if let Some(status) = status { order.set_status(status); }
        let event = tracking_number.and_then(|t| order.set_tracking_number(t));
        self.store.save_order_state(&order).await?;

        if let Some(event) = event {
            let chat = match order.account_id {
                Some(account_id) => self.store.chat_for_account(account_id).await.unwrap_or_else(|err| {
                    warn!(order_id = order.id, account_id, error = %err, "could not resolve customer chat");
                    None
                }),
                None => None,
            };
            self.notify(&event, chat).await;
        }
        Ok(order)
    }

    /// Writes the order and empties `cart`. Nothing resolvable empties it too;
    /// a storage failure leaves it untouched.
    async fn place(&self, cart: &mut Cart, new_order: std::result::Result<NewOrder, OrderError>) -> Result<Order> {
        let new_order = new_order.inspect_err(|_| cart.clear())?;
        let order = self.store.insert_order(new_order).await?;
        cart.clear();
        info!(order_id = order.id, total = %order.total_price, source = order.source.as_str(), "order placed");
        self.notify(&order.placed_event(), None).await;
        Ok(order)
    }

    async fn notify(&self, event: &DomainEvent, customer_chat: Option<i64>) {
        match self.store.site_settings().await {
            Ok(settings) => {
                let outcome = self.dispatcher.dispatch(&settings, event, customer_chat).await;
                debug!(?outcome, "notification dispatched");
            }
            Err(err) => warn!(error = %err, "could not load settings for notification"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::OrderItem;
    use crate::domain::value_objects::Money;
    use crate::notify::MockNotifier;
    use chrono::Utc;

    fn product(id: ProductId, price: i64) -> Product {
        Product {
            id, category_id: 1, name: format!("P{id}"), description: String::new(), price: Money::from_units(price),
            old_price: None, image: None, sizes: String::new(), colors: String::new(), is_active: true, created_at: Utc::now(),
        }
    }

    fn account(id: AccountId, phone: &str) -> Account {
        Account { id, username: phone.replace('+', ""), first_name: "Olena".into(), is_staff: false, phone: Some(phone.into()), password_hash: String::new() }
    }

    fn stored(new: NewOrder, id: OrderId) -> Order {
        Order {
            id,
            account_id: new.account_id,
            items: new.items.iter().enumerate().map(|(i, item)| OrderItem {
                id: i as i64 + 1, order_id: id, product_id: item.product_id, product_name: format!("P{}", item.product_id), price: item.price, quantity: item.quantity,
            }).collect(),
            customer: new.customer,
            delivery: new.delivery,
            payment_method: new.payment_method,
            status: OrderStatus::New,
            tracking_number: String::new(),
            total_price: new.total,
            source: new.source,
            created_at: Utc::now(),
        }
    }

    fn request(payment_method: PaymentMethod) -> CheckoutRequest {
        CheckoutRequest {
            customer: Customer { first_name: "Olena".into(), last_name: "K".into(), phone: "+380501234567".into() },
            delivery: Delivery { city: "Київ".into(), city_ref: String::new(), branch: "№1".into(), branch_ref: String::new() },
            payment_method,
        }
    }

    fn catalog_store() -> MockOrderStore {
        let mut store = MockOrderStore::new();
        store.expect_products_by_ids().returning(|_| Ok([(5, product(5, 500)), (7, product(7, 300))].into_iter().collect()));
        store.expect_site_settings().returning(|| Ok(SiteSettings::default()));
        store
    }

    fn quiet_dispatcher() -> NotificationDispatcher {
        let mut notifier = MockNotifier::new();
        notifier.expect_send_message().returning(|_, _, _| Ok(()));
        NotificationDispatcher::new(Arc::new(notifier))
    }

    fn cart_5x2_7x1() -> Cart {
        let mut cart = Cart::new();
        cart.add(5);
        cart.add(5);
        cart.add(7);
        cart
    }

    #[tokio::test]
    async fn test_checkout_snapshots_cart_into_order() {
        let mut store = catalog_store();
        store.expect_account_by_phone().returning(|phone| Ok(Some(account(3, phone))));
        store.expect_create_account().times(0);
        store.expect_insert_order()
            .withf(|o| o.total == Money::from_units(1300) && o.items.len() == 2 && o.source == OrderSource::Site && o.account_id == Some(3))
            .returning(|o| Ok(stored(o, 10)));
        let service = OrderService::new(Arc::new(store), quiet_dispatcher());

        let mut cart = cart_5x2_7x1();
        let outcome = service.checkout(&mut cart, request(PaymentMethod::CashOnDelivery), None).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(outcome.order.total_price, Money::from_units(1300));
        assert_eq!(outcome.order.items.iter().map(|i| i.quantity).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(outcome.next, NextStep::Confirmation);
        assert_eq!(outcome.provisioned_username, None);
    }

    #[tokio::test]
    async fn test_gateway_payment_redirects_and_clears_cart() {
        let mut store = catalog_store();
        store.expect_insert_order().returning(|o| Ok(stored(o, 11)));
        let service = OrderService::new(Arc::new(store), quiet_dispatcher());

        let mut cart = cart_5x2_7x1();
        let outcome = service.checkout(&mut cart, request(PaymentMethod::LiqPay), Some(9)).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(outcome.next, NextStep::Payment(11));
        assert_eq!(outcome.order.account_id, Some(9));
    }

    #[tokio::test]
    async fn test_unknown_phone_provisions_account() {
        let mut store = catalog_store();
        store.expect_account_by_phone().returning(|_| Ok(None));
        store.expect_create_account()
            .withf(|a| a.username == "380501234567" && a.phone.as_deref() == Some("+380501234567") && a.password_hash.starts_with("sha256$"))
            .times(1)
            .returning(|a| Ok(Account { id: 4, username: a.username, first_name: a.first_name, is_staff: false, phone: a.phone, password_hash: a.password_hash }));
        store.expect_insert_order().returning(|o| Ok(stored(o, 12)));
        let service = OrderService::new(Arc::new(store), quiet_dispatcher());

        let outcome = service.checkout(&mut cart_5x2_7x1(), request(PaymentMethod::Cash), None).await.unwrap();
        assert_eq!(outcome.provisioned_username.as_deref(), Some("380501234567"));
        assert_eq!(outcome.order.account_id, Some(4));
    }

    #[tokio::test]
    async fn test_vanished_products_are_skipped() {
        let mut store = MockOrderStore::new();
        store.expect_products_by_ids().returning(|_| Ok([(7, product(7, 300))].into_iter().collect()));
        store.expect_site_settings().returning(|| Ok(SiteSettings::default()));
        store.expect_insert_order()
            .withf(|o| o.total == Money::from_units(300) && o.items.len() == 1)
            .returning(|o| Ok(stored(o, 13)));
        let service = OrderService::new(Arc::new(store), quiet_dispatcher());

        let outcome = service.checkout(&mut cart_5x2_7x1(), request(PaymentMethod::Cash), Some(1)).await.unwrap();
        assert_eq!(outcome.order.total_price, Money::from_units(300));
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let service = OrderService::new(Arc::new(MockOrderStore::new()), quiet_dispatcher());
        let result = service.checkout(&mut Cart::new(), request(PaymentMethod::Cash), Some(1)).await;
        assert!(matches!(result, Err(ShopError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_order_placed_notifies_admin() {
        let mut store = MockOrderStore::new();
        store.expect_products_by_ids().returning(|_| Ok([(5, product(5, 500))].into_iter().collect()));
        store.expect_site_settings().returning(|| Ok(SiteSettings { telegram_bot_token: "T".into(), telegram_admin_id: "1".into(), ..SiteSettings::default() }));
        store.expect_insert_order().returning(|o| Ok(stored(o, 14)));
        let mut notifier = MockNotifier::new();
        notifier.expect_send_message()
            .withf(|_, chat, text| chat.to_string() == "1" && text.contains("#14"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let service = OrderService::new(Arc::new(store), NotificationDispatcher::new(Arc::new(notifier)));

        service.checkout(&mut cart_5x2_7x1(), request(PaymentMethod::Cash), Some(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_insert_keeps_cart() {
        let mut store = catalog_store();
        store.expect_insert_order().returning(|_| Err(ShopError::StorageError(sqlx::Error::PoolTimedOut)));
        let service = OrderService::new(Arc::new(store), quiet_dispatcher());

        let mut cart = cart_5x2_7x1();
        let result = service.checkout(&mut cart, request(PaymentMethod::LiqPay), Some(1)).await;
        assert!(matches!(result, Err(ShopError::StorageError(_))));
        assert_eq!(cart, cart_5x2_7x1());

        let user = TelegramUser { telegram_id: 77, account_id: None, first_name: "Ira".into(), username: String::new(), phone_number: String::new() };
        assert!(service.bot_checkout(&mut cart, &user).await.is_err());
        assert_eq!(cart.count(), 3);
    }

    #[tokio::test]
    async fn test_unresolvable_cart_is_cleared() {
        let mut store = MockOrderStore::new();
        store.expect_products_by_ids().returning(|_| Ok(HashMap::new()));
        store.expect_insert_order().times(0);
        let service = OrderService::new(Arc::new(store), quiet_dispatcher());

        let mut cart = cart_5x2_7x1();
        let result = service.checkout(&mut cart, request(PaymentMethod::Cash), Some(1)).await;
        assert!(matches!(result, Err(ShopError::Order(OrderError::NoItems))));
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_bot_checkout_truncates_long_names() {
        let mut store = catalog_store();
        store.expect_insert_order()
            .withf(|o| o.customer.first_name.chars().count() == Customer::FIRST_NAME_MAX)
            .returning(|o| Ok(stored(o, 16)));
        let service = OrderService::new(Arc::new(store), quiet_dispatcher());
        let user = TelegramUser { telegram_id: 78, account_id: None, first_name: "Я".repeat(64), username: String::new(), phone_number: "+380501234567".into() };

        let order = service.bot_checkout(&mut cart_5x2_7x1(), &user).await.unwrap();
        assert_eq!(order.customer.first_name, "Я".repeat(50));
    }

    #[tokio::test]
    async fn test_bot_checkout_uses_placeholders() {
        let mut store = catalog_store();
        store.expect_insert_order()
            .withf(|o| o.source == OrderSource::Bot && o.delivery.city == "Bot" && o.delivery.branch == "-" && o.customer.phone == "TG")
            .returning(|o| Ok(stored(o, 15)));
        let service = OrderService::new(Arc::new(store), quiet_dispatcher());
        let user = TelegramUser { telegram_id: 77, account_id: None, first_name: "Ira".into(), username: String::new(), phone_number: String::new() };

        let mut cart = cart_5x2_7x1();
        let order = service.bot_checkout(&mut cart, &user).await.unwrap();
        assert_eq!(order.id, 15);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_tracking_update_notifies_linked_chat_once() {
        let mut store = MockOrderStore::new();
        store.expect_order().returning(|id| {
            let new = NewOrder {
                account_id: Some(3), customer: Customer::default(), delivery: Delivery::default(), payment_method: PaymentMethod::Cash,
                source: OrderSource::Site, items: vec![], total: Money::from_units(100),
            };
            Ok(Some(stored(new, id)))
        });
        store.expect_save_order_state().returning(|_| Ok(()));
        store.expect_chat_for_account().returning(|_| Ok(Some(555)));
        store.expect_site_settings().returning(|| Ok(SiteSettings { telegram_bot_token: "T".into(), ..SiteSettings::default() }));
        let mut notifier = MockNotifier::new();
        notifier.expect_send_message()
            .withf(|_, chat, text| chat.to_string() == "555" && text.contains("2045"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let service = OrderService::new(Arc::new(store), NotificationDispatcher::new(Arc::new(notifier)));

        let order = service.update_order(20, Some(OrderStatus::Sent), Some("2045")).await.unwrap();
        assert_eq!(order.status, OrderStatus::Sent);
        assert_eq!(order.tracking_number, "2045");
        // The stored order has no tracking number, so clearing it is not a transition.
        service.update_order(20, None, Some("")).await.unwrap();
    }

    #[tokio::test]
    async fn test_tracking_update_survives_chat_lookup_failure() {
        let mut store = MockOrderStore::new();
        store.expect_order().returning(|id| {
            let new = NewOrder {
                account_id: Some(3), customer: Customer::default(), delivery: Delivery::default(), payment_method: PaymentMethod::Cash,
                source: OrderSource::Site, items: vec![], total: Money::from_units(100),
            };
            Ok(Some(stored(new, id)))
        });
        store.expect_save_order_state().times(1).returning(|_| Ok(()));
        store.expect_chat_for_account().returning(|_| Err(ShopError::StorageError(sqlx::Error::PoolTimedOut)));
        store.expect_site_settings().returning(|| Ok(SiteSettings { telegram_bot_token: "T".into(), ..SiteSettings::default() }));
        let mut notifier = MockNotifier::new();
        notifier.expect_send_message().times(0);
        let service = OrderService::new(Arc::new(store), NotificationDispatcher::new(Arc::new(notifier)));

        let order = service.update_order(21, None, Some("2046")).await.unwrap();
        assert_eq!(order.tracking_number, "2046");
    }

    #[tokio::test]
    async fn test_update_missing_order() {
        let mut store = MockOrderStore::new();
        store.expect_order().returning(|_| Ok(None));
        let service = OrderService::new(Arc::new(store), quiet_dispatcher());
        assert!(matches!(service.update_order(1, None, None).await, Err(ShopError::OrderNotFound)));
    }
}
