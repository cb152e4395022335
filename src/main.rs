//! Deborah Shop - storefront server and Telegram sales bot

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use teloxide::prelude::Bot;

use deborah_shop::bot::{App, AppContext, InMemoryBotCarts};
use deborah_shop::config::Config;
use deborah_shop::db::Db;
use deborah_shop::http::{self, AppState};
use deborah_shop::notify::{NotificationDispatcher, TelegramNotifier};
use deborah_shop::services::OrderService;
use deborah_shop::telemetry;

#[derive(Debug, Parser)]
#[command(name = "deborah-shop", version, about = "Clothing storefront and Telegram sales bot")]
struct Cli {
    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Serve the storefront and admin API (default)
    Serve {
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },
    /// Run the Telegram bot with long polling
    Bot,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let db = Db::connect(&config.database_url, config.max_connections).await?;
    let notifier = TelegramNotifier::new(&config.telegram_api_url, config.notify_timeout)?;
    let orders = OrderService::new(Arc::new(db.clone()), NotificationDispatcher::new(Arc::new(notifier)));

    match cli.command.unwrap_or(Mode::Serve { port: None }) {
        Mode::Serve { port } => {
            let port = port.unwrap_or(config.port);
            let app = http::router(AppState::new(db, orders));
            tracing::info!(port, "storefront listening on 0.0.0.0:{port}");
            axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", port)).await?, app).await?;
        }
        Mode::Bot => {
            let settings = db.site_settings().await?;
            let Some(token) = settings.bot_token() else {
                tracing::error!("telegram bot token is not configured in site settings");
                bail!("telegram bot token is not configured");
            };
            let bot = Bot::new(token);
            let context = AppContext::new(db, orders, Arc::new(InMemoryBotCarts::new()));
            App::new(bot, context).run().await?;
        }
    }
    Ok(())
}
