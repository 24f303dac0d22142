//! `agora-reports`: the recurring jobs.
//!
//! | Job                 | Cadence (UTC)       | Window   | Output                        |
//! |---------------------|---------------------|----------|-------------------------------|
//! | `sentiment_digest`  | Monday 10:00        | 7 days   | `sentiment_logs` row + log    |
//! | `challenge_summary` | Sunday 20:00        | 7 days   | discussion thread post        |
//! | `pitch_archive`     | 1st of month 12:00  | 30 days  | discussion thread post        |
//! | `heartbeat`         | every 5 minutes     | -        | ops escalation on failure     |
//!
//! Each report reads its window, reduces it and emits the result. They share
//! nothing but a [`ReportContext`], so one failing never affects another.

pub mod challenge;
pub mod context;
pub mod error;
pub mod heartbeat;
pub mod jobs;
pub mod pitches;
pub mod sentiment;

pub use context::ReportContext;
pub use error::{ReportError, Result};
pub use jobs::{recurring_jobs, register_recurring_jobs};
