//! Routes fired scheduler jobs to the poll resolver and the periodic reports.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use agora_core::JobAction;
use agora_polls::PollService;
use agora_reports::{challenge, heartbeat, pitches, sentiment, ReportContext, ReportError};
use agora_scheduler::{Job, JobHandler};
use agora_store::BotLogLevel;

pub struct JobRunner {
    polls: Arc<PollService>,
    reports: ReportContext,
}

impl JobRunner {
    pub fn new(polls: Arc<PollService>, reports: ReportContext) -> Self {
        Self { polls, reports }
    }

    async fn run_job(&self, job: &Job) -> Result<(), ReportError> {
        let now = Utc::now();
        match &job.action {
            JobAction::ResolvePoll { poll } => {
                let outcome = self.polls.resolve(&poll.poll_id).await;
                info!(job_id = %job.id, outcome = ?outcome, "poll resolution finished");
            }
            JobAction::SentimentDigest => {
                let record = sentiment::run(&self.reports, now).await?;
                debug!(score = record.score, "sentiment digest stored");
            }
            JobAction::ChallengeSummary => {
                if let Some(summary) = challenge::run(&self.reports, now).await? {
                    debug!(challenge_id = summary.challenge_id, "challenge summarised");
                }
            }
            JobAction::PitchArchive => {
                let top = pitches::run(&self.reports, now).await?;
                debug!(count = top.len(), "pitch archive posted");
            }
            JobAction::Heartbeat => {
                heartbeat::run(&self.reports).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl JobHandler for JobRunner {
    async fn run(&self, job: &Job) -> anyhow::Result<()> {
        if let Err(e) = self.run_job(job).await {
            // Heartbeat failures escalate on their own.
            if job.action != JobAction::Heartbeat {
                self.reports
                    .log_ops(
                        BotLogLevel::Error,
                        &format!("{} job {} failed: {e}", job.action.kind(), job.id),
                    )
                    .await;
            }
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use agora_channels::{testing::RecordingChannel, MessageChannel};
    use agora_core::retry::RetryPolicy;
    use agora_scheduler::{Scheduler, Trigger};
    use agora_store::{SqliteStore, Store};

    use super::*;

    const CHAT: i64 = -1003812789640;

    fn runner() -> (JobRunner, Arc<RecordingChannel>, Arc<SqliteStore>) {
        let channel = Arc::new(RecordingChannel::new());
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let retry = RetryPolicy::once(StdDuration::from_secs(1));
        let polls = Arc::new(PollService::new(
            Scheduler::new(None, StdDuration::from_secs(5)),
            channel.clone() as Arc<dyn MessageChannel>,
            store.clone() as Arc<dyn Store>,
            retry.clone(),
            chrono::Duration::hours(24),
        ));
        let reports = ReportContext {
            channel: channel.clone() as Arc<dyn MessageChannel>,
            store: store.clone() as Arc<dyn Store>,
            retry,
            chat_id: CHAT,
            discussion_thread: Some(5),
            ops_chat_id: None,
        };
        (JobRunner::new(polls, reports), channel, store)
    }

    fn job(action: JobAction) -> Job {
        Job::new("test", Trigger::Interval { every_secs: 60 }, action)
    }

    #[tokio::test]
    async fn resolve_job_evicts_poll() {
        let (runner, channel, _store) = runner();
        let poll_id = runner.polls.open_poll(CHAT, Some(5), 42).await.unwrap();
        let record = runner.polls.registry().get(&poll_id).unwrap();

        runner
            .run(&job(JobAction::ResolvePoll { poll: record }))
            .await
            .unwrap();
        assert!(runner.polls.registry().is_empty());
        assert_eq!(channel.stopped().len(), 1);
    }

    #[tokio::test]
    async fn untracked_poll_job_is_a_quiet_success() {
        let (runner, channel, store) = runner();
        let poll = agora_core::PollRecord {
            poll_id: "gone".into(),
            chat_id: CHAT,
            thread_id: Some(5),
            message_id: 7,
            author_id: 42,
            created_at: Utc::now(),
        };

        runner.run(&job(JobAction::ResolvePoll { poll })).await.unwrap();
        assert!(channel.stopped().is_empty());
        assert!(store.recent_bot_logs(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_report_is_logged_and_returned() {
        let (runner, channel, store) = runner();
        store
            .open_challenge("ship it", 1, Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();
        channel.fail_sends(true);

        assert!(runner.run(&job(JobAction::ChallengeSummary)).await.is_err());
        let logs = store.recent_bot_logs(5).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, "error");
    }

    #[tokio::test]
    async fn heartbeat_failure_is_logged_once() {
        let (runner, channel, store) = runner();
        channel.fail_identity(true);

        assert!(runner.run(&job(JobAction::Heartbeat)).await.is_err());
        let logs = store.recent_bot_logs(5).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, "critical");
    }

    #[tokio::test]
    async fn healthy_heartbeat_succeeds() {
        let (runner, _channel, _store) = runner();
        runner.run(&job(JobAction::Heartbeat)).await.unwrap();
    }
}
