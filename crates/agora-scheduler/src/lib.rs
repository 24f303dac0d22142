//! `agora-scheduler`: in-process job scheduler with optional SQLite persistence.
//!
//! # Overview
//!
//! Jobs live in memory inside [`engine::Scheduler`]. The timer loop sleeps
//! until the earliest `next_run` across all jobs (or until a job is
//! registered or cancelled), fires every due job in its own task, and then
//! either re-arms it (recurring triggers) or drops it (one-shot triggers).
//! When a [`db::JobStore`] is attached every change is queued to a writer
//! thread that applies it to the `scheduled_jobs` table, and
//! [`engine::Scheduler::restore`] brings pending jobs back after a restart.
//!
//! # Trigger variants
//!
//! | Variant    | Behaviour                                              |
//! |------------|--------------------------------------------------------|
//! | `Once`     | Single fire at an absolute UTC instant                 |
//! | `Interval` | Repeat every N seconds                                 |
//! | `Cron`     | Minute / hour / day-of-month / day-of-week pattern, UTC |

pub mod db;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod types;
mod writer;

pub use db::JobStore;
pub use engine::{JobHandler, Scheduler};
pub use error::{Result, SchedulerError};
pub use types::{CronPattern, Job, JobStatus, Trigger};
