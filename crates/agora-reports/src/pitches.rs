//! Monthly top pitches.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use agora_channels::format::{escape_html, truncate_chars};
use agora_core::{retry::with_retry, TimeWindow};
use agora_store::Pitch;

use crate::{context::ReportContext, error::Result};

pub const WINDOW_DAYS: i64 = 30;
pub const TOP_N: usize = 3;
const PREVIEW_CHARS: usize = 150;

/// Most liked first; ties go to the earlier pitch, then the lower row id.
pub fn rank(a: &Pitch, b: &Pitch) -> Ordering {
    b.likes
        .cmp(&a.likes)
        .then_with(|| a.at.cmp(&b.at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn top_pitches(mut pitches: Vec<Pitch>, n: usize) -> Vec<Pitch> {
    pitches.sort_by(rank);
    pitches.truncate(n);
    pitches
}

pub fn render(top: &[Pitch]) -> String {
    let mut out = String::from("🏆 <b>Top pitches of the month:</b>\n\n");
    for (i, pitch) in top.iter().enumerate() {
        let author = pitch.username.as_deref().unwrap_or("unknown");
        out.push_str(&format!(
            "{}. @{} (❤️ {})\n{}...\n\n",
            i + 1,
            escape_html(author),
            pitch.likes,
            escape_html(truncate_chars(&pitch.text, PREVIEW_CHARS)),
        ));
    }
    out.truncate(out.trim_end().len());
    out
}

/// Post the month's top pitches. Nothing is posted for an empty month.
pub async fn run(ctx: &ReportContext, now: DateTime<Utc>) -> Result<Vec<Pitch>> {
    let window = &TimeWindow::trailing(now, Duration::days(WINDOW_DAYS));
    let store = &ctx.store;

    let pitches =
        with_retry("pitches_between", &ctx.retry, move || store.pitches_between(window)).await?;
    let considered = pitches.len();
    let top = top_pitches(pitches, TOP_N);
    if top.is_empty() {
        info!("no pitches this month, skipping archive");
        return Ok(top);
    }

    ctx.post_to_discussion(render(&top)).await?;
    info!(considered, posted = top.len(), "pitch archive posted");
    Ok(top)
}
