//! Storefront interface strings in Ukrainian and English.

use std::collections::BTreeMap;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::Serialize;

pub const LANG_COOKIE: &str = "lang";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Uk,
    En,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Uk => "uk", Self::En => "en" }
    }

    /// Language chosen by the `lang` cookie in a `Cookie` request header; unknown or missing values give Ukrainian.
    pub fn from_cookie_header(header: Option<&str>) -> Self {
        header
            .into_iter()
            .flat_map(cookie::Cookie::split_parse)
            .filter_map(|c| c.ok())
            .find(|c| c.name() == LANG_COOKIE)
            .and_then(|c| c.value().parse().ok())
            .unwrap_or_default()
    }

    pub fn translations(&self) -> &'static Translations {
        match self { Self::Uk => &UK, Self::En => &EN }
    }
}

impl FromStr for Lang {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uk" => Ok(Self::Uk),
            "en" => Ok(Self::En),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

pub type Translations = BTreeMap<&'static str, &'static str>;

static UK: Lazy<Translations> = Lazy::new(|| ENTRIES.iter().map(|(key, uk, _)| (*key, *uk)).collect());
static EN: Lazy<Translations> = Lazy::new(|| ENTRIES.iter().map(|(key, _, en)| (*key, *en)).collect());

// (key, uk, en)
const ENTRIES: &[(&str, &str, &str)] = &[
    ("home", "Головна", "Home"),
    ("collection", "Колекція", "Collection"),
    ("dresses", "Сукні", "Dresses"),
    ("lingerie", "Білизна", "Lingerie"),
    ("accessories", "Аксесуари", "Accessories"),
    ("sale", "Розпродаж", "Sale"),
    ("favorites", "Обране", "Favorites"),
    ("cart", "Кошик", "Cart"),
    ("profile", "Кабінет", "Profile"),
    ("login", "Вхід", "Login"),
    ("logout", "Вихід", "Logout"),
    ("register", "Реєстрація", "Register"),
    ("add_to_cart", "Додати в кошик", "Add to Cart"),
    ("quick_view", "Швидкий перегляд", "Quick View"),
    ("view_details", "Детальніше", "View Details"),
    ("checkout", "Оформити замовлення", "Checkout"),
    ("continue_shopping", "Продовжити покупки", "Continue Shopping"),
    ("clear_cart", "Очистити кошик", "Clear Cart"),
    ("total", "Разом", "Total"),
    ("subtotal", "Проміжний підсумок", "Subtotal"),
    ("payment", "Оплата", "Payment"),
    ("delivery", "Доставка", "Delivery"),
    ("city", "Місто", "City"),
    ("warehouse", "Відділення", "Warehouse"),
    ("select_city", "Оберіть місто", "Select city"),
    ("select_warehouse", "Оберіть відділення", "Select warehouse"),
    ("first_name", "Ім'я", "First Name"),
    ("last_name", "Прізвище", "Last Name"),
    ("phone", "Телефон", "Phone"),
    ("email", "Email", "Email"),
    ("password", "Пароль", "Password"),
    ("confirm_password", "Підтвердіть пароль", "Confirm Password"),
    ("order_placed", "Дякуємо за замовлення!", "Thank you for your order!"),
    ("empty_cart", "Кошик порожній", "Your cart is empty"),
    ("no_products", "Товарів немає", "No products"),
    ("added_to_cart", "Додано в кошик!", "Added to cart!"),
    ("removed_from_cart", "Видалено з кошика", "Removed from cart"),
    ("details", "Деталі", "Details"),
    ("composition", "Склад", "Composition"),
    ("care", "Догляд", "Care Instructions"),
    ("delivery_returns", "Доставка та повернення", "Delivery & Returns"),
    ("reviews", "Відгуки", "Reviews"),
    ("related", "Рекомендовані товари", "Related Products"),
    ("size", "Розмір", "Size"),
    ("color", "Колір", "Color"),
    ("select_size", "Оберіть розмір", "Select size"),
    ("select_color", "Оберіть колір", "Select color"),
    ("in_stock", "В наявності", "In Stock"),
    ("out_of_stock", "Немає в наявності", "Out of Stock"),
    ("search", "Пошук", "Search"),
    ("filter", "Фільтр", "Filter"),
    ("sort", "Сортувати", "Sort"),
    ("all", "Всі", "All"),
    ("new", "Новинки", "New Arrivals"),
    ("free_shipping", "Безкоштовна доставка від 2000 грн", "Free shipping over 2000 UAH"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_selects_language() {
        assert_eq!(Lang::from_cookie_header(Some("sessionid=abc; lang=en")), Lang::En);
        assert_eq!(Lang::from_cookie_header(Some("lang=fr")), Lang::Uk);
        assert_eq!(Lang::from_cookie_header(None), Lang::Uk);
    }

    #[test]
    fn test_home_translation() {
        assert_eq!(Lang::En.translations()["home"], "Home");
        assert_eq!(Lang::Uk.translations()["home"], "Головна");
    }

    #[test]
    fn test_tables_share_keys() {
        assert_eq!(UK.len(), ENTRIES.len());
        assert!(UK.keys().eq(EN.keys()));
    }
}
