//! Outbound Telegram notifications for order events.
//!
//! Delivery is best effort: failures come back as [`NotifyError`] and the
//! dispatcher logs them instead of surfacing them to the request.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::settings::SiteSettings;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telegram rejected the message: {0}")]
    Rejected(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, token: &str, chat_id: &str, text: &str) -> Result<(), NotifyError>;
}

/// Telegram Bot API `sendMessage` over HTTP.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_url: String,
}

impl TelegramNotifier {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, api_url: api_url.into().trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, token: &str, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, token);
        let response = self.client.post(url).form(&[("chat_id", chat_id), ("text", text)]).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!("{status}: {body}")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Skipped(&'static str),
    Failed,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: std::sync::Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: std::sync::Arc<dyn Notifier>) -> Self { Self { notifier } }

    /// Delivers `event`: order placements go to the admin chat, tracking updates
    /// to `customer_chat` (the chat linked to the order's account).
    pub async fn dispatch(&self, settings: &SiteSettings, event: &DomainEvent, customer_chat: Option<i64>) -> DispatchOutcome {
        let DomainEvent::Order(order_event) = event;
        let (token, chat_id) = match order_event {
            OrderEvent::Placed { .. } => match settings.admin_chat() {
                Some((token, admin)) => (token, admin.to_string()),
                None => return DispatchOutcome::Skipped("admin chat not configured"),
            },
            OrderEvent::TrackingAssigned { .. } => {
                let Some(token) = settings.bot_token() else { return DispatchOutcome::Skipped("bot token not configured") };
                let Some(chat) = customer_chat else { return DispatchOutcome::Skipped("customer has no linked chat") };
                (token, chat.to_string())
            }
        };

        let text = message_text(order_event);
        match self.notifier.send_message(token, &chat_id, &text).await {
            Ok(()) => {
                info!(chat_id = %chat_id, "notification sent");
                DispatchOutcome::Sent
            }
            Err(err) => {
                warn!(chat_id = %chat_id, error = %err, "notification delivery failed");
                DispatchOutcome::Failed
            }
        }
    }
}

pub fn message_text(event: &OrderEvent) -> String {
    match event {
        OrderEvent::Placed { order_id, total, phone, city, branch } => {
            format!("🔥 Замовлення #{order_id}\n💰 {total} грн\n📞 {phone}\n📍 {city}, {branch}")
        }
        OrderEvent::TrackingAssigned { order_id, tracking_number, .. } => {
            format!("🚚 Замовлення #{order_id} відправлено!\n📦 ТТН: {tracking_number}")
        }
    }
}
