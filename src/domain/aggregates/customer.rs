//! Customer Aggregates: storefront accounts and their chat identities

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::domain::value_objects::{AccountId, Money};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub first_name: String,
    pub is_staff: bool,
    pub phone: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
}

impl Account {
    pub fn check_password(&self, password: &str) -> bool { verify_password(password, &self.password_hash) }
}

/// A chat identity; linked to an account once the user shares their phone contact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TelegramUser {
    pub telegram_id: i64,
    pub account_id: Option<AccountId>,
    pub first_name: String,
    pub username: String,
    pub phone_number: String,
}

impl TelegramUser {
    pub fn is_linked(&self) -> bool { self.account_id.is_some() }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CustomerStats {
    pub account_id: AccountId,
    pub username: String,
    pub phone: Option<String>,
    pub orders_count: i64,
    pub total_spent: Money,
}

/// Account to create; the password is hashed before it reaches the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub phone: Option<String>,
}

impl NewAccount {
    pub fn new(username: impl Into<String>, password: &str, first_name: impl Into<String>, phone: Option<String>) -> Self {
        Self { username: username.into(), password_hash: hash_password(password), first_name: first_name.into(), phone }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Credentials {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

const HASH_SCHEME: &str = "sha256";

/// Salted SHA-256 digest stored as `sha256$<salt hex>$<digest hex>`.
/// A single unstretched round, so it offers little against offline guessing
/// once the table leaks.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = to_hex(&salt);
    format!("{HASH_SCHEME}${salt}${}", digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(HASH_SCHEME), Some(salt), Some(expected)) => constant_time_eq(digest(salt, password).as_bytes(), expected.as_bytes()),
        _ => false,
    }
}

/// Eight-character throwaway password for accounts provisioned at checkout or from the bot.
pub fn generate_password() -> String {
    uuid::Uuid::new_v4().simple().to_string().chars().take(8).collect()
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    to_hex(&hasher.finalize())
}

/// Examines every byte regardless of where the first mismatch is.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("secret");
        assert!(hash.starts_with("sha256$"));
        assert!(verify_password("secret", &hash));
        assert!(!verify_password("Secret", &hash));
        assert_ne!(hash, hash_password("secret"), "salts differ");
        let truncated = &hash[..hash.len() - 1];
        assert!(!verify_password("secret", truncated));
        assert!(!verify_password("secret", "md5$aa$bb"));
        assert!(!verify_password("secret", "plain"));
    }

    #[test]
    fn test_generated_password() {
        let pw = generate_password();
        assert_eq!(pw.len(), 8);
        assert!(pw.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_account_check_password() {
        let new = NewAccount::new("380501234567", "pw", "Olena", Some("+380501234567".into()));
        let account = Account { id: 1, username: new.username, first_name: new.first_name, is_staff: false, phone: new.phone, password_hash: new.password_hash };
        assert!(account.check_password("pw"));
    }
}
