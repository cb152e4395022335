//! Process configuration from the environment (`.env` is loaded first).

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_PORT: u16 = 8083;
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
    pub telegram_api_url: String,
    pub notify_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        Ok(Self {
            database_url,
            port: parse_or("PORT", env::var("PORT").ok(), DEFAULT_PORT),
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", env::var("DATABASE_MAX_CONNECTIONS").ok(), 10),
            telegram_api_url: env::var("TELEGRAM_API_URL").unwrap_or_else(|_| DEFAULT_TELEGRAM_API_URL.to_string()),
            notify_timeout: Duration::from_secs(parse_or("NOTIFY_TIMEOUT_SECS", env::var("NOTIFY_TIMEOUT_SECS").ok(), 10)),
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match raw.as_deref().map(str::trim) {
        None | Some("") => default,
        Some(value) => match value.parse::<T>() {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(variable = name, value, error = %err, "invalid value, using default");
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::parse_or;

    #[test]
    fn parses_present_values() {
        assert_eq!(parse_or("PORT", Some("9000".into()), 8083u16), 9000);
    }

    #[test]
    fn falls_back_on_missing_or_invalid() {
        assert_eq!(parse_or("PORT", None, 8083u16), 8083);
        assert_eq!(parse_or("PORT", Some(" ".into()), 8083u16), 8083);
        assert_eq!(parse_or("PORT", Some("abc".into()), 8083u16), 8083);
    }
}
