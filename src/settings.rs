//! Merchant settings kept in the single-row `site_settings` table.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub site_name: String,
    pub meta_description: String,
    pub show_ticker: bool,
    pub nova_poshta_api_key: String,
    pub telegram_bot_token: String,
    pub telegram_admin_id: String,
    pub wfp_merchant_login: String,
    pub wfp_secret_key: String,
    pub liqpay_public_key: String,
    pub liqpay_private_key: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "DEBORAH".into(),
            meta_description: String::new(),
            show_ticker: true,
            nova_poshta_api_key: String::new(),
            telegram_bot_token: String::new(),
            telegram_admin_id: String::new(),
            wfp_merchant_login: String::new(),
            wfp_secret_key: String::new(),
            liqpay_public_key: String::new(),
            liqpay_private_key: String::new(),
        }
    }
}

impl SiteSettings {
    pub fn bot_token(&self) -> Option<&str> { non_empty(&self.telegram_bot_token) }

    /// Token and chat id for order alerts; `None` unless both are configured.
    pub fn admin_chat(&self) -> Option<(&str, &str)> {
        Some((self.bot_token()?, non_empty(&self.telegram_admin_id)?))
    }

    pub fn wayforpay_login(&self) -> Option<&str> { non_empty(&self.wfp_merchant_login) }
    pub fn liqpay_public_key(&self) -> Option<&str> { non_empty(&self.liqpay_public_key) }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::SiteSettings;

    #[test]
    fn admin_chat_requires_token_and_id() {
        let mut settings = SiteSettings::default();
        assert!(settings.admin_chat().is_none());
        settings.telegram_bot_token = "123:abc".into();
        assert!(settings.admin_chat().is_none());
        settings.telegram_admin_id = " 42 ".into();
        assert_eq!(settings.admin_chat(), Some(("123:abc", "42")));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings: SiteSettings = serde_json::from_str(r#"{"liqpay_public_key": "pk"}"#).unwrap();
        assert_eq!(settings.site_name, "DEBORAH");
        assert_eq!(settings.liqpay_public_key(), Some("pk"));
        assert_eq!(settings.wayforpay_login(), None);
    }
}
