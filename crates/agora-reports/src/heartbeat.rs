//! Liveness self-check against the chat platform.

use tracing::{debug, error, warn};

use agora_channels::OutboundMessage;
use agora_core::retry::with_retry;
use agora_store::BotLogLevel;

use crate::{context::ReportContext, error::Result};

pub const INTERVAL_SECS: u64 = 5 * 60;

/// Ask the platform who we are. On failure, escalate to `bot_logs` at
/// `critical` and to the ops chat if one is configured, then return the
/// error so the job is marked failed.
pub async fn run(ctx: &ReportContext) -> Result<String> {
    let channel = &ctx.channel;
    match with_retry("identity", &ctx.retry, move || channel.identity()).await {
        Ok(me) => {
            debug!(bot = %me, "heartbeat ok");
            Ok(me)
        }
        Err(e) => {
            error!(error = %e, "heartbeat failed, bot may be offline");
            let message = format!("Bot offline: {e}");
            ctx.log_ops(BotLogLevel::Critical, &message).await;

            if let Some(ops_chat) = ctx.ops_chat_id {
                let alert = &OutboundMessage::plain(ops_chat, format!("⚠️ {message}"));
                let policy = &ctx.retry.non_idempotent();
                if let Err(send_err) =
                    with_retry("ops_alert", policy, move || channel.send(alert)).await
                {
                    warn!(error = %send_err, "ops alert not delivered");
                }
            }
            Err(e.into())
        }
    }
}
