//! Weekly emoji sentiment digest.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use agora_core::{retry::with_retry, TimeWindow};
use agora_store::SentimentRecord;

use crate::{context::ReportContext, error::Result};

pub const WINDOW_DAYS: i64 = 7;

pub const POSITIVE: [&str; 10] = ["😊", "😄", "🎉", "❤️", "👍", "🔥", "✨", "💪", "🚀", "⭐"];
pub const NEGATIVE: [&str; 6] = ["😢", "😞", "😠", "👎", "💔", "😰"];
pub const NEUTRAL: [&str; 3] = ["🤔", "🙂", "😐"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmojiTally {
    pub positive: u32,
    pub negative: u32,
    pub neutral: u32,
}

impl EmojiTally {
    /// Tally every message in `texts`.
    pub fn of<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut tally = Self::default();
        for text in texts {
            tally.add(text);
        }
        tally
    }

    /// Count every occurrence of each class's emoji in `text`.
    pub fn add(&mut self, text: &str) {
        self.positive += occurrences(text, &POSITIVE);
        self.negative += occurrences(text, &NEGATIVE);
        self.neutral += occurrences(text, &NEUTRAL);
    }

    pub fn total(&self) -> u32 {
        self.positive + self.negative + self.neutral
    }

    /// `(positive - negative) / total * 100`, or `0` with no emoji at all.
    pub fn score(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (f64::from(self.positive) - f64::from(self.negative)) / f64::from(total) * 100.0
    }
}

fn occurrences(text: &str, set: &[&str]) -> u32 {
    set.iter().map(|e| text.matches(e).count() as u32).sum()
}

/// Tally the last week of group messages and store the result.
pub async fn run(ctx: &ReportContext, now: DateTime<Utc>) -> Result<SentimentRecord> {
    let window = &TimeWindow::trailing(now, Duration::days(WINDOW_DAYS));
    let store = &ctx.store;

    let messages = with_retry("group_logs_between", &ctx.retry, move || {
        store.group_logs_between(window, None)
    })
    .await?;
    let tally = EmojiTally::of(messages.iter().map(|m| m.text.as_str()));

    let record = &SentimentRecord {
        week_start: window.start,
        positive: tally.positive,
        negative: tally.negative,
        neutral: tally.neutral,
        score: (tally.score() * 100.0).round() / 100.0,
        at: now,
    };
    let policy = &ctx.retry.non_idempotent();
    with_retry("insert_sentiment", policy, move || store.insert_sentiment(record)).await?;

    info!(
        messages = messages.len(),
        positive = tally.positive,
        negative = tally.negative,
        neutral = tally.neutral,
        score = record.score,
        "sentiment digest stored"
    );
    Ok(record.clone())
}
