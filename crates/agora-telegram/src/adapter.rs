//! Telegram channel adapter.
//!
//! Wraps a teloxide `Bot` + `Dispatcher` and drives the long-polling event loop
//! until shutdown is signalled.

use std::sync::Arc;

use teloxide::prelude::*;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::context::BotContext;
use crate::handler::handle_message;

/// Long polling, so no public URL is required.
pub struct TelegramAdapter {
    bot: Bot,
    ctx: Arc<BotContext>,
}

impl TelegramAdapter {
    pub fn new(bot: Bot, ctx: Arc<BotContext>) -> Self {
        Self { bot, ctx }
    }

    /// Drive the long-polling loop until `shutdown` flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Telegram: starting long-polling dispatcher");

        let handler = Update::filter_message().endpoint(handle_message);

        let mut dispatcher = Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![self.ctx])
            .default_handler(|_upd| async {})
            .build();

        let token = dispatcher.shutdown_token();
        tokio::spawn(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
            match token.shutdown() {
                Ok(done) => {
                    done.await;
                    info!("Telegram: dispatcher stopped");
                }
                Err(e) => warn!(error = %e, "Telegram: dispatcher was not running"),
            }
        });

        dispatcher.dispatch().await;
    }
}
