//! Job action descriptor shared between the scheduler and the components it drives.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::PollRecord;

/// What a scheduled job does when it fires.
///
/// Stored as JSON in the `scheduled_jobs.action` column, so every variant
/// carries the arguments it needs and nothing else. The gateway's job runner
/// maps each variant onto the component that implements it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobAction {
    /// Close a rating poll, score it, report to the author and evict it.
    ResolvePoll { poll: PollRecord },
    /// Weekly emoji sentiment tally over the group log.
    SentimentDigest,
    /// Weekly wrap-up of the active challenge.
    ChallengeSummary,
    /// Monthly top-3 pitches by likes.
    PitchArchive,
    /// Liveness self-check against the messaging platform.
    Heartbeat,
}

impl JobAction {
    /// Stable lowercase label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            JobAction::ResolvePoll { .. } => "resolve_poll",
            JobAction::SentimentDigest => "sentiment_digest",
            JobAction::ChallengeSummary => "challenge_summary",
            JobAction::PitchArchive => "pitch_archive",
            JobAction::Heartbeat => "heartbeat",
        }
    }
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobAction::ResolvePoll { poll } => write!(f, "resolve_poll({})", poll.poll_id),
            other => write!(f, "{}", other.kind()),
        }
    }
}
