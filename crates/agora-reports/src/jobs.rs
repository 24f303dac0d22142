use chrono::Weekday;
use tracing::{debug, info};

use agora_core::JobAction;
use agora_scheduler::{CronPattern, Job, Scheduler, SchedulerError, Trigger};

use crate::{error::Result, heartbeat};

/// The four recurring jobs with their fixed cadences.
pub fn recurring_jobs() -> Vec<Job> {
    vec![
        Job::new(
            "sentiment_digest",
            Trigger::Cron(CronPattern::weekly(Weekday::Mon, 10, 0)),
            JobAction::SentimentDigest,
        ),
        Job::new(
            "challenge_summary",
            Trigger::Cron(CronPattern::weekly(Weekday::Sun, 20, 0)),
            JobAction::ChallengeSummary,
        ),
        Job::new(
            "pitch_archive",
            Trigger::Cron(CronPattern::monthly(1, 12, 0)),
            JobAction::PitchArchive,
        ),
        Job::new(
            "heartbeat",
            Trigger::Interval {
                every_secs: heartbeat::INTERVAL_SECS,
            },
            JobAction::Heartbeat,
        ),
    ]
}

/// Register the recurring jobs. Safe to call repeatedly: jobs that are already
/// scheduled (for instance restored from the job store) are left as they are.
///
/// Returns the number of jobs newly registered.
pub fn register_recurring_jobs(scheduler: &Scheduler) -> Result<usize> {
    let mut added = 0;
    for job in recurring_jobs() {
        match scheduler.register(job) {
            Ok(job) => {
                debug!(job_id = %job.id, next_run = ?job.next_run, "recurring job registered");
                added += 1;
            }
            Err(SchedulerError::DuplicateJob { id }) => {
                debug!(job_id = %id, "recurring job already scheduled");
            }
            Err(e) => return Err(e.into()),
        }
    }
    info!(added, total = scheduler.len(), "recurring jobs in place");
    Ok(added)
}
