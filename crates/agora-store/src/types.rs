use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A community member as seen on an inbound message or join event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: String,
}

/// One row of `group_logs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMessage {
    pub user_id: i64,
    pub username: Option<String>,
    pub text: String,
    pub thread_id: Option<i32>,
    pub at: DateTime<Utc>,
}

/// One row of `pitches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pitch {
    pub id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub text: String,
    pub likes: u32,
    pub at: DateTime<Utc>,
}

/// A pitch about to be inserted; `likes` starts at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPitch {
    pub user_id: i64,
    pub username: Option<String>,
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: i64,
    pub text: String,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Result of a resolved rating poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub author_id: i64,
    /// Rounded to two decimals.
    pub average_rating: f64,
    pub total_votes: u32,
    pub at: DateTime<Utc>,
}

/// Weekly emoji tally written by the sentiment digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub week_start: DateTime<Utc>,
    pub positive: u32,
    pub negative: u32,
    pub neutral: u32,
    /// Rounded to two decimals.
    pub score: f64,
    pub at: DateTime<Utc>,
}

/// Severity of a `bot_logs` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotLogLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for BotLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BotLogLevel::Info => "info",
            BotLogLevel::Warning => "warning",
            BotLogLevel::Error => "error",
            BotLogLevel::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotLogEntry {
    pub level: String,
    pub message: String,
    pub at: DateTime<Utc>,
}
