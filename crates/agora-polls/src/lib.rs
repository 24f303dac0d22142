//! `agora-polls`: pitch rating polls from open to eviction.
//!
//! [`PollService::open_poll`] posts the rating poll, tracks it in the
//! [`PollRegistry`] and schedules a one-shot `ResolvePoll` job. When that job
//! fires, [`PollService::resolve`] walks the poll through
//! `Open -> Stopped -> Scored | ZeroVotes -> Evicted`.

pub mod error;
pub mod registry;
pub mod scoring;
pub mod service;

pub use error::{PollError, Result};
pub use registry::PollRegistry;
pub use scoring::{score, RatingScore};
pub use service::{job_id, PollService, Resolution};
