use std::sync::Arc;

use tracing::error;

use agora_channels::{MessageChannel, OutboundMessage};
use agora_core::retry::{with_retry, RetryPolicy};
use agora_store::{BotLogLevel, Store};

use crate::error::Result;

/// Collaborators and destinations shared by every report.
#[derive(Clone)]
pub struct ReportContext {
    pub channel: Arc<dyn MessageChannel>,
    pub store: Arc<dyn Store>,
    pub retry: RetryPolicy,
    /// The community chat reports are posted to.
    pub chat_id: i64,
    pub discussion_thread: Option<i32>,
    /// Operational escalation chat. Never the community chat.
    pub ops_chat_id: Option<i64>,
}

impl ReportContext {
    /// Post an HTML report to the community chat's discussion thread.
    pub async fn post_to_discussion(&self, html: String) -> Result<()> {
        let msg = &OutboundMessage::html(self.chat_id, html).in_thread(self.discussion_thread);
        let channel = &self.channel;
        with_retry("post_report", &self.retry.non_idempotent(), move || channel.send(msg)).await?;
        Ok(())
    }

    /// Best-effort `bot_logs` write; failures are only traced.
    pub async fn log_ops(&self, level: BotLogLevel, message: &str) {
        let store = &self.store;
        if let Err(e) = with_retry("log_bot_event", &self.retry.non_idempotent(), move || {
            store.log_bot_event(level, message)
        })
        .await
        {
            error!(error = %e, "writing bot log failed");
        }
    }
}
