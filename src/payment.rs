//! Payment hand-off.
//!
//! After a gateway checkout the visitor lands on `/pay/{id}/`, which describes
//! what the client needs to open the gateway widget. Without the matching
//! merchant key configured the order falls back to a mock page.

use serde::Serialize;

use crate::domain::aggregates::{Order, PaymentMethod};
use crate::domain::value_objects::{Money, OrderId};
use crate::settings::SiteSettings;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum PaymentPage {
    WayForPay { merchant_login: String, order: PaymentOrder },
    LiqPay { public_key: String, order: PaymentOrder },
    Mock { order: PaymentOrder },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentOrder {
    pub id: OrderId,
    pub reference: String,
    pub amount: Money,
    pub currency: &'static str,
    pub description: String,
    pub product_names: Vec<String>,
    pub product_counts: Vec<u32>,
    pub product_prices: Vec<Money>,
}

impl PaymentOrder {
    fn from_order(order: &Order) -> Self {
        Self {
            id: order.id,
            reference: format!("DEBORAH-{}", order.id),
            amount: order.total_price,
            currency: Money::CURRENCY,
            description: format!("Замовлення #{}", order.id),
            product_names: order.items.iter().map(|i| i.product_name.clone()).collect(),
            product_counts: order.items.iter().map(|i| i.quantity).collect(),
            product_prices: order.items.iter().map(|i| i.price).collect(),
        }
    }
}

impl PaymentPage {
    /// Picks the page for the order's own payment method.
    pub fn for_order(order: &Order, settings: &SiteSettings) -> Self {
        let details = PaymentOrder::from_order(order);
        match order.payment_method {
            PaymentMethod::WayForPay => match settings.wayforpay_login() {
                Some(login) => Self::WayForPay { merchant_login: login.to_string(), order: details },
                None => Self::Mock { order: details },
            },
            PaymentMethod::LiqPay => match settings.liqpay_public_key() {
                Some(key) => Self::LiqPay { public_key: key.to_string(), order: details },
                None => Self::Mock { order: details },
            },
            PaymentMethod::CashOnDelivery | PaymentMethod::Cash => Self::Mock { order: details },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Customer, Delivery, OrderItem, OrderSource, OrderStatus};
    use chrono::Utc;

    fn order(method: PaymentMethod) -> Order {
        Order {
            id: 8, account_id: None, customer: Customer::default(), delivery: Delivery::default(), payment_method: method,
            status: OrderStatus::New, tracking_number: String::new(), total_price: Money::from_units(1300), source: OrderSource::Site,
            created_at: Utc::now(),
            items: vec![OrderItem { id: 1, order_id: 8, product_id: 5, product_name: "Сукня".into(), price: Money::from_units(500), quantity: 2 }],
        }
    }

    #[test]
    fn test_gateway_requires_its_key() {
        let mut settings = SiteSettings::default();
        assert!(matches!(PaymentPage::for_order(&order(PaymentMethod::WayForPay), &settings), PaymentPage::Mock { .. }));

        settings.wfp_merchant_login = "shop_ua".into();
        settings.liqpay_public_key = "pk".into();
        assert!(matches!(
            PaymentPage::for_order(&order(PaymentMethod::WayForPay), &settings),
            PaymentPage::WayForPay { ref merchant_login, .. } if merchant_login == "shop_ua"
        ));
        assert!(matches!(PaymentPage::for_order(&order(PaymentMethod::LiqPay), &settings), PaymentPage::LiqPay { .. }));
        assert!(matches!(PaymentPage::for_order(&order(PaymentMethod::Cash), &settings), PaymentPage::Mock { .. }));
    }

    #[test]
    fn test_page_json() {
        let page = PaymentPage::for_order(&order(PaymentMethod::LiqPay), &SiteSettings::default());
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["provider"], "mock");
        assert_eq!(json["order"]["reference"], "DEBORAH-8");
        assert_eq!(json["order"]["product_counts"], serde_json::json!([2]));
    }
}
