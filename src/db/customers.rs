use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres};
use tracing::{info, instrument};

use super::{is_unique_violation, Db};
use crate::domain::aggregates::{Account, CustomerStats, NewAccount, TelegramUser};
use crate::domain::value_objects::{AccountId, Money};
use crate::{Result, ShopError};

const ACCOUNT_SELECT: &str = "SELECT a.id, a.username, a.first_name, a.is_staff, p.phone, a.password_hash FROM accounts a LEFT JOIN profiles p ON p.account_id = a.id";

#[derive(FromRow)]
struct AccountRow {
    id: i64,
    username: String,
    first_name: String,
    is_staff: bool,
    phone: Option<String>,
    password_hash: String,
}

impl From<AccountRow> for Account {
    fn from(r: AccountRow) -> Self {
        Account { id: r.id, username: r.username, first_name: r.first_name, is_staff: r.is_staff, phone: r.phone, password_hash: r.password_hash }
    }
}

#[derive(FromRow)]
struct TelegramUserRow {
    telegram_id: i64,
    account_id: Option<i64>,
    first_name: String,
    username: String,
    phone_number: String,
}

impl From<TelegramUserRow> for TelegramUser {
    fn from(r: TelegramUserRow) -> Self {
        TelegramUser { telegram_id: r.telegram_id, account_id: r.account_id, first_name: r.first_name, username: r.username, phone_number: r.phone_number }
    }
}

#[derive(FromRow)]
struct StatsRow {
    id: i64,
    username: String,
    phone: Option<String>,
    orders_count: i64,
    total_spent: Decimal,
}

impl Db {
    #[instrument(skip(self))]
    pub async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query_as::<Postgres, AccountRow>(&format!("{ACCOUNT_SELECT} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Account::from))
    }

    #[instrument(skip(self))]
    pub async fn account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<Postgres, AccountRow>(&format!("{ACCOUNT_SELECT} WHERE a.username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Account::from))
    }

    #[instrument(skip(self))]
    pub async fn account_by_phone(&self, phone: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<Postgres, AccountRow>(&format!("{ACCOUNT_SELECT} WHERE p.phone = $1"))
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Account::from))
    }

    /// Creates the account and its profile together.
    #[instrument(skip(self, account), fields(username = %account.username))]
    pub async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let mut tx = self.pool.begin().await?;
        let id: i64 = sqlx::query_scalar("INSERT INTO accounts (username, password_hash, first_name) VALUES ($1, $2, $3) RETURNING id")
            .bind(&account.username)
            .bind(&account.password_hash)
            .bind(&account.first_name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| if is_unique_violation(&e) { ShopError::UsernameTaken } else { e.into() })?;
        sqlx::query("INSERT INTO profiles (account_id, phone) VALUES ($1, $2)")
            .bind(id)
            .bind(&account.phone)
            .execute(&mut *tx)
            .await
            .map_err(|e| if is_unique_violation(&e) { ShopError::Validation("phone is already registered".into()) } else { e.into() })?;
        tx.commit().await?;
        info!(account_id = id, "account created");
        Ok(Account { id, username: account.username, first_name: account.first_name, is_staff: false, phone: account.phone, password_hash: account.password_hash })
    }

    /// Returns the stored identity, recording a new one on first contact.
    #[instrument(skip(self))]
    pub async fn get_or_create_telegram_user(&self, telegram_id: i64, first_name: &str, username: &str) -> Result<TelegramUser> {
        let row = sqlx::query_as::<Postgres, TelegramUserRow>(
            "INSERT INTO telegram_users (telegram_id, first_name, username) VALUES ($1, $2, $3) \
             ON CONFLICT (telegram_id) DO UPDATE SET telegram_id = EXCLUDED.telegram_id \
             RETURNING telegram_id, account_id, first_name, username, phone_number",
        )
        .bind(telegram_id)
        .bind(first_name)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    #[instrument(skip(self))]
    pub async fn link_telegram_user(&self, telegram_id: i64, account_id: AccountId, phone: &str) -> Result<TelegramUser> {
        let row = sqlx::query_as::<Postgres, TelegramUserRow>(
            "UPDATE telegram_users SET account_id = $2, phone_number = $3 WHERE telegram_id = $1 \
             RETURNING telegram_id, account_id, first_name, username, phone_number",
        )
        .bind(telegram_id)
        .bind(account_id)
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    /// Chat id of a Telegram identity linked to the account, if any.
    #[instrument(skip(self))]
    pub async fn chat_for_account(&self, account_id: AccountId) -> Result<Option<i64>> {
        let chat = sqlx::query_scalar("SELECT telegram_id FROM telegram_users WHERE account_id = $1 ORDER BY telegram_id LIMIT 1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(chat)
    }

    #[instrument(skip(self))]
    pub async fn customer_stats(&self) -> Result<Vec<CustomerStats>> {
        let rows = sqlx::query_as::<Postgres, StatsRow>(
            "SELECT a.id, a.username, p.phone, COUNT(o.id) AS orders_count, COALESCE(SUM(o.total_price), 0) AS total_spent \
             FROM accounts a LEFT JOIN profiles p ON p.account_id = a.id LEFT JOIN orders o ON o.account_id = a.id \
             GROUP BY a.id, a.username, p.phone ORDER BY a.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|r| Ok(CustomerStats { account_id: r.id, username: r.username, phone: r.phone, orders_count: r.orders_count, total_spent: Money::new(r.total_spent)? }))
            .collect()
    }
}
