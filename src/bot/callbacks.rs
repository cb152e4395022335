//! Inline-keyboard callback payloads.

use std::fmt;
use std::str::FromStr;

use crate::domain::value_objects::{CategoryId, ProductId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Start,
    Catalog,
    Category(CategoryId),
    Add(ProductId),
    Cart,
    Clear,
    Checkout,
}

impl FromStr for CallbackAction {
    type Err = String;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        match data {
            "start" => return Ok(Self::Start),
            "catalog" => return Ok(Self::Catalog),
            "cart" => return Ok(Self::Cart),
            "clear" => return Ok(Self::Clear),
            "checkout" => return Ok(Self::Checkout),
            _ => {}
        }
        let parse_id = |raw: &str| raw.parse::<i64>().map_err(|_| format!("bad id in callback: {data}"));
        if let Some(id) = data.strip_prefix("cat_") {
            return parse_id(id).map(Self::Category);
        }
        if let Some(id) = data.strip_prefix("add_") {
            return parse_id(id).map(Self::Add);
        }
        Err(format!("unknown callback: {data}"))
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Catalog => f.write_str("catalog"),
            Self::Category(id) => write!(f, "cat_{id}"),
            Self::Add(id) => write!(f, "add_{id}"),
            Self::Cart => f.write_str("cart"),
            Self::Clear => f.write_str("clear"),
            Self::Checkout => f.write_str("checkout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CallbackAction;

    #[test]
    fn parses_known_payloads() {
        assert_eq!("catalog".parse::<CallbackAction>(), Ok(CallbackAction::Catalog));
        assert_eq!("cat_12".parse::<CallbackAction>(), Ok(CallbackAction::Category(12)));
        assert_eq!("add_7".parse::<CallbackAction>(), Ok(CallbackAction::Add(7)));
        assert_eq!(CallbackAction::Add(7).to_string(), "add_7");
    }

    #[test]
    fn rejects_unknown_payloads() {
        assert!("add_x".parse::<CallbackAction>().is_err());
        assert!("menu".parse::<CallbackAction>().is_err());
    }
}
