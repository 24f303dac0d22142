//! Weekly challenge wrap-up.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use agora_channels::format::{escape_html, truncate_chars};
use agora_core::{retry::with_retry, TimeWindow};
use agora_store::{Challenge, GroupMessage};

use crate::{context::ReportContext, error::Result};

pub const WINDOW_DAYS: i64 = 7;
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeSummary {
    pub challenge_id: i64,
    pub responses: usize,
    pub participants: usize,
}

/// `(responses, distinct participants)` over the discussion messages.
pub fn tally(messages: &[GroupMessage]) -> (usize, usize) {
    let participants: HashSet<i64> = messages.iter().map(|m| m.user_id).collect();
    (messages.len(), participants.len())
}

pub fn render(challenge: &Challenge, responses: usize, participants: usize) -> String {
    format!(
        "📊 <b>Weekly challenge results</b>\n\n\
         🎯 {}...\n\n\
         📈 <b>Results:</b>\n\
         • Responses: {responses}\n\
         • Participants: {participants}\n\n\
         Thanks, everyone! 🎉",
        escape_html(truncate_chars(&challenge.text, PREVIEW_CHARS)),
    )
}

/// Summarise the active challenge opened this week and close it.
///
/// Returns `None` without posting when no such challenge exists.
pub async fn run(ctx: &ReportContext, now: DateTime<Utc>) -> Result<Option<ChallengeSummary>> {
    let window = &TimeWindow::trailing(now, Duration::days(WINDOW_DAYS));
    let store = &ctx.store;

    let challenge = with_retry("active_challenge_between", &ctx.retry, move || {
        store.active_challenge_between(window)
    })
    .await?;
    let Some(challenge) = challenge else {
        info!("no active challenge this week, skipping summary");
        return Ok(None);
    };

    let thread = ctx.discussion_thread;
    let messages = with_retry("group_logs_between", &ctx.retry, move || {
        store.group_logs_between(window, thread)
    })
    .await?;
    let (responses, participants) = tally(&messages);

    ctx.post_to_discussion(render(&challenge, responses, participants))
        .await?;

    let id = challenge.id;
    with_retry("deactivate_challenge", &ctx.retry, move || {
        store.deactivate_challenge(id)
    })
    .await?;

    info!(challenge_id = id, responses, participants, "challenge summary posted");
    Ok(Some(ChallengeSummary {
        challenge_id: id,
        responses,
        participants,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(user_id: i64) -> GroupMessage {
        GroupMessage {
            user_id,
            username: None,
            text: "my answer".into(),
            thread_id: Some(5),
            at: Utc::now(),
        }
    }

    #[test]
    fn participants_are_distinct_authors() {
        let messages = [msg(1), msg(2), msg(1), msg(3), msg(1)];
        assert_eq!(tally(&messages), (5, 3));
        assert_eq!(tally(&[]), (0, 0));
    }

    #[test]
    fn long_challenge_text_is_cut_and_escaped() {
        let challenge = Challenge {
            id: 1,
            text: format!("<b>{}</b>", "x".repeat(200)),
            created_by: 1,
            created_at: Utc::now(),
            is_active: true,
        };
        let html = render(&challenge, 4, 2);
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains(&"x".repeat(100)));
        assert!(html.contains(&"x".repeat(97)));
        assert!(html.contains("Responses: 4"));
        assert!(html.contains("Participants: 2"));
    }
}
