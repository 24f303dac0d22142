use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};

use agora_channels::MessageChannel;
use agora_core::{
    retry::{with_retry, RetryPolicy},
    types::PollId,
    JobAction, PollRecord,
};
use agora_scheduler::{Job, Scheduler, Trigger};
use agora_store::{BotLogLevel, RatingRecord, Store};

use crate::{
    error::Result,
    registry::PollRegistry,
    scoring::{round2, score, RatingScore},
};

/// Terminal outcome of resolving one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Nothing tracked under this id: already resolved, cancelled or unknown.
    Untracked,
    /// The platform refused or failed to close the poll.
    StopFailed,
    ZeroVotes,
    Scored(RatingScore),
}

/// Scheduler job id of the resolver for `poll_id`.
pub fn job_id(poll_id: &PollId) -> String {
    format!("poll:{poll_id}")
}

/// Opens, cancels and resolves rating polls.
pub struct PollService {
    registry: PollRegistry,
    scheduler: Scheduler,
    channel: Arc<dyn MessageChannel>,
    store: Arc<dyn Store>,
    retry: RetryPolicy,
    resolve_after: Duration,
}

impl PollService {
    pub fn new(
        scheduler: Scheduler,
        channel: Arc<dyn MessageChannel>,
        store: Arc<dyn Store>,
        retry: RetryPolicy,
        resolve_after: Duration,
    ) -> Self {
        Self {
            registry: PollRegistry::new(),
            scheduler,
            channel,
            store,
            retry,
            resolve_after,
        }
    }

    pub fn registry(&self) -> &PollRegistry {
        &self.registry
    }

    /// Delay between opening a poll and resolving it.
    pub fn resolve_after(&self) -> Duration {
        self.resolve_after
    }

    /// Post a rating poll and schedule its resolution `resolve_after` from now.
    ///
    /// The registry entry and the resolver job are created together: if the
    /// job cannot be registered the entry is dropped again and the posted
    /// poll is closed, so neither outlives the other.
    pub async fn open_poll(
        &self,
        chat_id: i64,
        thread_id: Option<i32>,
        author_id: i64,
    ) -> Result<PollId> {
        // A poll posted by a timed-out attempt would never be tracked.
        let channel = &self.channel;
        let opened = with_retry("send_rating_poll", &self.retry.non_idempotent(), move || {
            channel.send_rating_poll(chat_id, thread_id)
        })
        .await?;

        let record = PollRecord {
            poll_id: opened.poll_id.clone(),
            chat_id,
            thread_id,
            message_id: opened.message_id,
            author_id,
            created_at: Utc::now(),
        };

        if let Err(e) = self.track(record) {
            warn!(poll_id = %opened.poll_id, error = %e, "could not schedule poll resolution, closing poll");
            if let Err(stop) = self.channel.stop_poll(chat_id, opened.message_id).await {
                warn!(poll_id = %opened.poll_id, error = %stop, "closing untracked poll failed");
            }
            return Err(e);
        }

        info!(poll_id = %opened.poll_id, author_id, chat_id, "rating poll opened");
        Ok(opened.poll_id)
    }

    fn track(&self, record: PollRecord) -> Result<()> {
        let poll_id = record.poll_id.clone();
        let at = record.created_at + self.resolve_after;
        self.registry.insert(record.clone())?;

        let job = Job::new(
            job_id(&poll_id),
            Trigger::Once { at },
            JobAction::ResolvePoll { poll: record },
        );
        if let Err(e) = self.scheduler.register(job) {
            self.registry.remove(&poll_id);
            return Err(e.into());
        }
        Ok(())
    }

    /// Drop a pending poll without scoring it and close it in the chat.
    ///
    /// Returns `false` if the poll is unknown or its resolution is already
    /// running.
    pub async fn cancel_poll(&self, poll_id: &PollId) -> Result<bool> {
        if !self.scheduler.cancel(&job_id(poll_id))? {
            debug!(poll_id = %poll_id, "nothing to cancel");
            return Ok(false);
        }
        let Some(record) = self.registry.remove(poll_id) else {
            return Ok(true);
        };
        let channel = &self.channel;
        if let Err(e) = with_retry("stop_poll", &self.retry, move || {
            channel.stop_poll(record.chat_id, record.message_id)
        })
        .await
        {
            warn!(poll_id = %poll_id, error = %e, "cancelled poll could not be closed");
        }
        info!(poll_id = %poll_id, "rating poll cancelled");
        Ok(true)
    }

    /// Evict one poll, then close, score, record and report it.
    ///
    /// Never fails: every error is logged. The entry leaves the registry
    /// before any I/O starts, so a resolution cut off by the job timeout
    /// still evicts it.
    pub async fn resolve(&self, poll_id: &PollId) -> Resolution {
        let Some(record) = self.registry.remove(poll_id) else {
            debug!(poll_id = %poll_id, "poll not tracked, nothing to resolve");
            return Resolution::Untracked;
        };
        debug!(poll_id = %poll_id, "poll evicted, resolving");

        let outcome = self.close_and_score(&record).await;
        info!(poll_id = %poll_id, outcome = ?outcome, "poll resolved");
        outcome
    }

    async fn close_and_score(&self, record: &PollRecord) -> Resolution {
        let channel = &self.channel;
        let counts = match with_retry("stop_poll", &self.retry, move || {
            channel.stop_poll(record.chat_id, record.message_id)
        })
        .await
        {
            Ok(counts) => counts,
            Err(e) => {
                error!(poll_id = %record.poll_id, error = %e, "stopping poll failed");
                self.log_ops(format!("stop poll {} failed: {e}", record.poll_id))
                    .await;
                return Resolution::StopFailed;
            }
        };

        let Some(score) = score(&counts) else {
            info!(poll_id = %record.poll_id, "poll closed without votes");
            return Resolution::ZeroVotes;
        };

        let rating = &RatingRecord {
            author_id: record.author_id,
            average_rating: round2(score.average),
            total_votes: score.total,
            at: Utc::now(),
        };
        let store = &self.store;
        let writes = &self.retry.non_idempotent();
        if let Err(e) =
            with_retry("insert_rating", writes, move || store.insert_rating(rating)).await
        {
            error!(poll_id = %record.poll_id, error = %e, "saving rating failed");
            self.log_ops(format!("saving rating for poll {} failed: {e}", record.poll_id))
                .await;
        }

        let text = &report_text(&score);
        let author_id = record.author_id;
        if let Err(e) = with_retry("send_direct", writes, move || {
            channel.send_direct(author_id, text)
        })
        .await
        {
            warn!(poll_id = %record.poll_id, author_id, error = %e, "rating report not delivered");
        }

        info!(
            poll_id = %record.poll_id,
            average = score.average,
            total = score.total,
            "poll scored"
        );
        Resolution::Scored(score)
    }

    /// Rebuild registry entries from restored `ResolvePoll` jobs.
    pub fn rehydrate(&self, jobs: &[Job]) -> usize {
        let mut restored = 0;
        for job in jobs {
            if let JobAction::ResolvePoll { poll } = &job.action {
                match self.registry.insert(poll.clone()) {
                    Ok(()) => restored += 1,
                    Err(e) => debug!(job_id = %job.id, "skipping rehydration: {e}"),
                }
            }
        }
        if restored > 0 {
            info!(count = restored, "re-tracked open polls from persisted jobs");
        }
        restored
    }

    async fn log_ops(&self, message: String) {
        if let Err(e) = self.store.log_bot_event(BotLogLevel::Error, &message).await {
            error!(error = %e, "writing bot log failed");
        }
    }
}

/// Direct message sent to the pitch author.
pub fn report_text(score: &RatingScore) -> String {
    format!(
        "📊 Your pitch rating\n\n⭐ Average: {:.1}/5\n👥 Votes: {}",
        score.average, score.total
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_uses_one_decimal() {
        let text = report_text(&RatingScore {
            average: 3.666,
            total: 3,
        });
        assert!(text.contains("3.7/5"));
        assert!(text.contains("Votes: 3"));
    }

    #[test]
    fn job_id_is_namespaced() {
        assert_eq!(job_id(&"5001".into()), "poll:5001");
    }
}
