pub mod account;
pub mod admin;
pub mod cart;
pub mod checkout;
pub mod pages;
pub mod store;

use tower_sessions::Session;

use super::session;
use super::SharedState;
use crate::domain::aggregates::Account;
use crate::{Result, ShopError};

/// The logged-in account, if the session carries one that still exists.
async fn current_account(state: &SharedState, session: &Session) -> Result<Option<Account>> {
    match session::account_id(session).await? {
        Some(id) => state.db.account(id).await,
        None => Ok(None),
    }
}

async fn require_staff(state: &SharedState, session: &Session) -> Result<Account> {
    let account = current_account(state, session).await?.ok_or(ShopError::LoginRequired)?;
    if !account.is_staff {
        tracing::warn!(account_id = account.id, "non-staff account tried an admin route");
        return Err(ShopError::Forbidden);
    }
    Ok(account)
}
