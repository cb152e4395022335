use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use validator::Validate;

use super::current_account;
use crate::domain::aggregates::customer::Credentials;
use crate::domain::aggregates::{Account, NewAccount, Order};
use crate::http::context::{FlashLevel, GlobalContext, View};
use crate::http::{session, SharedState};
use crate::{Result, ShopError};

#[derive(Serialize)]
pub struct AuthView {
    account: Option<Account>,
}

pub async fn auth_page(State(state): State<SharedState>, session: Session, headers: HeaderMap) -> Result<Json<View<AuthView>>> {
    let account = current_account(&state, &session).await?;
    let context = GlobalContext::load(&state, &session, &headers).await?;
    Ok(Json(View { context, data: AuthView { account } }))
}

#[derive(Debug, Deserialize)]
pub struct AuthForm {
    #[serde(default)]
    pub action: String,
    #[serde(flatten)]
    pub credentials: Credentials,
}

/// Login, or registration when `action=register`. Failures flash a message and return to `/auth/`.
pub async fn auth(State(state): State<SharedState>, session: Session, Form(form): Form<AuthForm>) -> Result<Response> {
    let result = if form.action == "register" {
        register(&state, &form.credentials).await
    } else {
        login(&state, &form.credentials).await
    };
    match result {
        Ok(account) => {
            session::login(&session, account.id).await?;
            tracing::info!(account_id = account.id, "signed in");
            Ok(Redirect::to("/profile/").into_response())
        }
        Err(err @ (ShopError::UsernameTaken | ShopError::InvalidCredentials | ShopError::Validation(_))) => {
            session::flash(&session, FlashLevel::Error, err.to_string()).await?;
            Ok(Redirect::to("/auth/").into_response())
        }
        Err(err) => Err(err),
    }
}

async fn register(state: &SharedState, credentials: &Credentials) -> Result<Account> {
    credentials.validate()?;
    let username = credentials.username.trim();
    if state.db.account_by_username(username).await?.is_some() {
        return Err(ShopError::UsernameTaken);
    }
    // Registration uses the local part of a Ukrainian number as the username.
    let phone = format!("+380{username}");
    state.db.create_account(NewAccount::new(username, &credentials.password, "", Some(phone))).await
}

async fn login(state: &SharedState, credentials: &Credentials) -> Result<Account> {
    credentials.validate()?;
    match state.db.account_by_username(credentials.username.trim()).await? {
        Some(account) if account.check_password(&credentials.password) => Ok(account),
        _ => Err(ShopError::InvalidCredentials),
    }
}

pub async fn logout(session: Session) -> Result<Redirect> {
    session::logout(&session).await?;
    Ok(Redirect::to("/"))
}

#[derive(Serialize)]
pub struct ProfileView {
    account: Account,
    orders: Vec<Order>,
}

pub async fn profile(State(state): State<SharedState>, session: Session, headers: HeaderMap) -> Result<Response> {
    let Some(account) = current_account(&state, &session).await? else {
        return Ok(Redirect::to("/auth/").into_response());
    };
    let orders = state.db.orders_for_account(account.id).await?;
    let context = GlobalContext::load(&state, &session, &headers).await?;
    Ok(Json(View { context, data: ProfileView { account, orders } }).into_response())
}
