//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type ProductId = i64;
pub type CategoryId = i64;
pub type OrderId = i64;
pub type AccountId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("slug must not be empty")]
    EmptySlug,
    #[error("slug may only contain lowercase letters, digits, '-' and '_'")]
    InvalidSlug,
    #[error("phone number must not be empty")]
    EmptyPhone,
    #[error("amount must not be negative")]
    NegativeAmount,
}

/// Money value object.
///
/// Prices are whole hryvnias (`NUMERIC(10, 0)` in the database); the single
/// storefront sells in one currency so the currency is implied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const CURRENCY: &'static str = "UAH";

    pub fn new(amount: Decimal) -> Result<Self, ValueError> {
        if amount.is_sign_negative() && !amount.is_zero() { return Err(ValueError::NegativeAmount); }
        Ok(Self(amount))
    }
    pub fn from_units(units: i64) -> Self { Self(Decimal::from(units.max(0))) }
    pub fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn add(&self, other: &Money) -> Money { Money(self.0 + other.0) }
    pub fn multiply(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0.normalize()) }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self { iter.fold(Money::zero(), |acc, m| acc.add(&m)) }
}

/// URL slug for categories and landing pages.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let value = value.into().trim().to_lowercase();
        if value.is_empty() { return Err(ValueError::EmptySlug); }
        if !value.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_') {
            return Err(ValueError::InvalidSlug);
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Slug {
    type Error = ValueError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self { slug.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Customer phone number; the identity that ties web and bot customers together.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Phone(String);

impl Phone {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(ValueError::EmptyPhone); }
        Ok(Self(value))
    }

    /// Normalizes a contact shared through the bot to the `+380` form.
    ///
    /// Leading `3`, `8` and `0` digits are stripped before the country prefix is
    /// re-applied, so `380501234567` and `0501234567` both become `+380501234567`.
    pub fn normalize_ua(raw: &str) -> Result<Self, ValueError> {
        let raw = raw.trim();
        if raw.is_empty() { return Err(ValueError::EmptyPhone); }
        if raw.starts_with("+380") { return Ok(Self(raw.to_string())); }
        let local = raw.trim_start_matches(['3', '8', '0']).replace('+', "");
        Ok(Self(format!("+380{local}")))
    }

    /// Username used when an account is provisioned for this phone.
    pub fn as_username(&self) -> String { self.0.replace('+', "") }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
