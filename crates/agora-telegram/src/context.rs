use std::sync::Arc;

use agora_channels::MessageChannel;
use agora_core::{config::TelegramConfig, retry::RetryPolicy};
use agora_polls::PollService;
use agora_scheduler::Scheduler;
use agora_store::Store;

use crate::allow;

/// Shared state injected into every dispatcher handler.
pub struct BotContext {
    pub config: TelegramConfig,
    /// Our own username, used to filter `/cmd@otherbot`. `None` when the
    /// startup identity check failed.
    pub bot_username: Option<String>,
    pub polls: Arc<PollService>,
    pub scheduler: Scheduler,
    pub store: Arc<dyn Store>,
    pub channel: Arc<dyn MessageChannel>,
    pub retry: RetryPolicy,
}

impl BotContext {
    pub fn is_admin(&self, user_id: i64) -> bool {
        allow::is_admin(&self.config.admin_ids, user_id)
    }

    /// Whether `chat_id` is the community group this bot serves.
    pub fn is_community(&self, chat_id: i64) -> bool {
        chat_id == self.config.chat_id
    }

    pub fn discussion_thread(&self) -> Option<i32> {
        Some(self.config.threads.discussion)
    }
}
