use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::dptree;
use teloxide::prelude::*;
use tracing::info;

use super::{build_schema, AppContext};

pub struct App {
    bot: Bot,
    context: Arc<AppContext>,
    handler: UpdateHandler<anyhow::Error>,
}

impl App {
    pub fn new(bot: Bot, context: AppContext) -> Self {
        Self { bot, context: Arc::new(context), handler: build_schema() }
    }

    /// Long-polls until interrupted.
    pub async fn run(self) -> anyhow::Result<()> {
        let me = self.bot.get_me().await?;
        info!(username = me.username(), "bot running");

        Dispatcher::builder(self.bot.clone(), self.handler)
            .dependencies(dptree::deps![self.context.clone()])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
        Ok(())
    }
}
