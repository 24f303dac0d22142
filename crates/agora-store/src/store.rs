use async_trait::async_trait;
use chrono::{DateTime, Utc};

use agora_core::TimeWindow;

use crate::{error::Result, types::*};

/// The persistent-store port used by the poll resolver, the aggregators and
/// the inbound message path.
///
/// Range queries take a half-open [`TimeWindow`] and return rows in
/// chronological order.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert the member on first sight, otherwise refresh name and `last_active`.
    async fn upsert_user(&self, member: &Member, at: DateTime<Utc>) -> Result<()>;

    async fn log_message(&self, message: &GroupMessage) -> Result<i64>;

    async fn insert_pitch(&self, pitch: &NewPitch) -> Result<i64>;

    async fn insert_rating(&self, rating: &RatingRecord) -> Result<i64>;

    async fn insert_sentiment(&self, record: &SentimentRecord) -> Result<i64>;

    /// Append to `bot_logs`, timestamped now.
    async fn log_bot_event(&self, level: BotLogLevel, message: &str) -> Result<()>;

    /// Group messages inside `window`, optionally restricted to one thread.
    async fn group_logs_between(
        &self,
        window: &TimeWindow,
        thread_id: Option<i32>,
    ) -> Result<Vec<GroupMessage>>;

    async fn open_challenge(&self, text: &str, created_by: i64, at: DateTime<Utc>) -> Result<i64>;

    /// Most recently opened active challenge created inside `window`.
    async fn active_challenge_between(&self, window: &TimeWindow) -> Result<Option<Challenge>>;

    /// Mark a challenge inactive. `NotFound` if the id does not exist.
    async fn deactivate_challenge(&self, id: i64) -> Result<()>;

    async fn pitches_between(&self, window: &TimeWindow) -> Result<Vec<Pitch>>;

    /// Rating history of one author, newest first.
    async fn ratings_for(&self, author_id: i64) -> Result<Vec<RatingRecord>>;

    /// Latest `limit` operational log rows, newest first.
    async fn recent_bot_logs(&self, limit: u32) -> Result<Vec<BotLogEntry>>;
}
