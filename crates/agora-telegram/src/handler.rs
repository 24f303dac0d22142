use std::sync::Arc;

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::User;
use tracing::{debug, info, warn};

use agora_channels::{format::escape_html, OutboundMessage};
use agora_core::{
    retry::with_retry,
    types::{format_duration, format_timestamp},
};
use agora_store::{BotLogLevel, Member};

use crate::{
    command::{parse_command, Command},
    context::BotContext,
    ingest::{ingest, Incoming},
};

const HELP_TEXT: &str = "Commands:\n\
/ratepitch - open a rating poll for your pitch\n\
/help - show this message\n\
\n\
Admins:\n\
/challenge <text> - start a weekly challenge\n\
/cancelpoll <poll id> - drop a pending rating poll\n\
/jobs - list scheduled jobs\n\
\n\
Tag a message with #pitch to enter it into the monthly archive.";

const WELCOME_TEXT: &str = "👋 Hi! I run pitch ratings, weekly challenges and the monthly pitch archive for this community.\n\nSend /help to see what I can do.";

fn member(user: &User) -> Member {
    Member {
        user_id: user.id.0 as i64,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
    }
}

/// Handle a single inbound Telegram message.
pub async fn handle_message(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;

    if let Some(joined) = msg.new_chat_members() {
        if ctx.is_community(chat_id) {
            for user in joined.iter().filter(|u| !u.is_bot) {
                if let Err(e) = ctx.store.upsert_user(&member(user), Utc::now()).await {
                    warn!(user_id = user.id.0, error = %e, "failed to record new member");
                }
            }
        }
        return Ok(());
    }

    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if user.is_bot {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let thread_id = msg.thread_id.map(|t| t.0 .0);

    if let Some(command) = parse_command(text, ctx.bot_username.as_deref()) {
        let user_id = user.id.0 as i64;
        info!(user_id, chat_id, command = ?command, "command received");
        if let Some(reply) = execute(&ctx, user_id, command).await {
            let mut req = bot.send_message(msg.chat.id, reply);
            if let Some(t) = msg.thread_id {
                req = req.message_thread_id(t);
            }
            req.await?;
        }
        return Ok(());
    }

    if !ctx.is_community(chat_id) {
        debug!(chat_id, "ignoring message outside the community chat");
        return Ok(());
    }

    let incoming = Incoming {
        member: member(user),
        text: text.to_string(),
        thread_id,
        at: Utc::now(),
    };
    if let Err(e) = ingest(ctx.store.as_ref(), &incoming).await {
        warn!(user_id = incoming.member.user_id, error = %e, "failed to record message");
        if let Err(e) = ctx
            .store
            .log_bot_event(BotLogLevel::Error, &format!("recording message failed: {e}"))
            .await
        {
            warn!(error = %e, "writing bot log failed");
        }
    }
    Ok(())
}

/// Run a parsed command on behalf of `user_id` and return the reply text.
pub async fn execute(ctx: &BotContext, user_id: i64, command: Command) -> Option<String> {
    if command.admin_only() && !ctx.is_admin(user_id) {
        info!(user_id, command = ?command, "admin command refused");
        return Some("⛔ This command is for admins only.".to_string());
    }

    let reply = match command {
        Command::Start => WELCOME_TEXT.to_string(),
        Command::Help => HELP_TEXT.to_string(),
        Command::RatePitch => rate_pitch(ctx, user_id).await,
        Command::Challenge(text) => start_challenge(ctx, user_id, &text).await,
        Command::CancelPoll(id) => cancel_poll(ctx, &id).await,
        Command::Jobs => list_jobs(ctx),
    };
    Some(reply)
}

async fn rate_pitch(ctx: &BotContext, user_id: i64) -> String {
    match ctx
        .polls
        .open_poll(ctx.config.chat_id, ctx.discussion_thread(), user_id)
        .await
    {
        Ok(_) => format!(
            "✅ Poll created! Results in {}, sent to you privately.",
            format_duration(ctx.polls.resolve_after())
        ),
        Err(e) => {
            warn!(user_id, error = %e, "opening rating poll failed");
            "❌ Could not create the poll, please try again later.".to_string()
        }
    }
}

async fn start_challenge(ctx: &BotContext, user_id: i64, text: &str) -> String {
    if text.is_empty() {
        return "Usage: /challenge <text>".to_string();
    }
    let id = match ctx.store.open_challenge(text, user_id, Utc::now()).await {
        Ok(id) => id,
        Err(e) => {
            warn!(user_id, error = %e, "saving challenge failed");
            return "❌ Could not save the challenge.".to_string();
        }
    };
    info!(challenge_id = id, created_by = user_id, "challenge opened");

    let announcement = &OutboundMessage::html(
        ctx.config.chat_id,
        format!(
            "🎯 <b>New weekly challenge!</b>\n\n{}\n\nReply in this thread with your results.",
            escape_html(text)
        ),
    )
    .in_thread(ctx.discussion_thread());
    let channel = &ctx.channel;
    let policy = &ctx.retry.non_idempotent();
    match with_retry("send", policy, move || channel.send(announcement)).await {
        Ok(()) => "✅ Challenge started.".to_string(),
        Err(e) => {
            warn!(challenge_id = id, error = %e, "challenge announcement failed");
            "⚠️ Challenge saved, but the announcement could not be posted.".to_string()
        }
    }
}

async fn cancel_poll(ctx: &BotContext, poll_id: &str) -> String {
    if poll_id.is_empty() {
        return "Usage: /cancelpoll <poll id>".to_string();
    }
    match ctx.polls.cancel_poll(&poll_id.into()).await {
        Ok(true) => format!("✅ Poll {poll_id} cancelled."),
        Ok(false) => format!("ℹ️ No pending poll {poll_id}."),
        Err(e) => {
            warn!(poll_id, error = %e, "cancelling poll failed");
            format!("❌ Could not cancel poll {poll_id}.")
        }
    }
}

fn list_jobs(ctx: &BotContext) -> String {
    let jobs = ctx.scheduler.list();
    if jobs.is_empty() {
        return "No scheduled jobs.".to_string();
    }
    let mut out = format!("🗓 {} scheduled jobs:", jobs.len());
    for job in jobs {
        let next = job
            .next_run
            .map(format_timestamp)
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "\n{} · {} · next {} · runs {}",
            job.id, job.status, next, job.run_count
        ));
    }
    out
}
