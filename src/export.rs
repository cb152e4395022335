//! CSV export of orders for spreadsheet tools.

use crate::domain::aggregates::Order;
use crate::{Result, ShopError};

pub const CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const FILE_NAME: &str = "orders.csv";

const BOM: &str = "\u{feff}";
const HEADER: [&str; 9] = ["ID", "Дата", "Клієнт", "Телефон", "Місто", "Сума", "Статус", "ТТН", "Джерело"];

/// Serializes `orders` with a UTF-8 byte-order mark so Excel detects the encoding.
pub fn orders_csv(orders: &[Order]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(BOM.as_bytes().to_vec());
    writer.write_record(HEADER).map_err(export_error)?;
    for order in orders {
        let tracking = if order.tracking_number.is_empty() { "-" } else { order.tracking_number.as_str() };
        let record = [
            order.id.to_string(),
            order.created_at.format("%d.%m.%Y %H:%M").to_string(),
            format!("{} {}", order.customer.first_name, order.customer.last_name),
            order.customer.phone.clone(),
            order.delivery.city.clone(),
            order.total_price.to_string(),
            order.status.display_name().to_string(),
            tracking.to_string(),
            order.source.as_str().to_string(),
        ];
        writer.write_record(&record).map_err(export_error)?;
    }
    writer.into_inner().map_err(|e| ShopError::Export(e.to_string()))
}

fn export_error(err: csv::Error) -> ShopError {
    ShopError::Export(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Customer, Delivery, OrderSource, OrderStatus, PaymentMethod};
    use crate::domain::value_objects::Money;
    use chrono::{TimeZone, Utc};

    fn order(id: i64, tracking: &str, status: OrderStatus) -> Order {
        Order {
            id,
            account_id: None,
            customer: Customer { first_name: "Olena".into(), last_name: "Koval".into(), phone: "+380501234567".into() },
            delivery: Delivery { city: "Львів, обл.".into(), ..Delivery::default() },
            payment_method: PaymentMethod::CashOnDelivery,
            status,
            tracking_number: tracking.into(),
            total_price: Money::from_units(1300),
            source: OrderSource::Bot,
            created_at: Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap(),
            items: vec![],
        }
    }

    #[test]
    fn test_orders_csv() {
        let bytes = orders_csv(&[order(1, "", OrderStatus::New), order(2, "2045", OrderStatus::Sent)]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with('\u{feff}'));
        let lines: Vec<&str> = text.trim_start_matches('\u{feff}').lines().collect();
        assert_eq!(lines[0], "ID,Дата,Клієнт,Телефон,Місто,Сума,Статус,ТТН,Джерело");
        assert_eq!(lines[1], "1,05.03.2024 14:07,Olena Koval,+380501234567,\"Львів, обл.\",1300,Новий,-,bot");
        assert_eq!(lines[2], "2,05.03.2024 14:07,Olena Koval,+380501234567,\"Львів, обл.\",1300,Відправлено,2045,bot");
    }
}
