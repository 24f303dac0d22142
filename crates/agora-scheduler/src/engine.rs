use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, Notify};
use tracing::{error, info, warn};

use crate::{
    db::JobStore,
    error::{Result, SchedulerError},
    schedule,
    types::{Job, JobStatus},
    writer::JobWriter,
};

/// Longest the loop sleeps before re-checking, even if nothing is due sooner.
const MAX_IDLE: Duration = Duration::from_secs(60);

/// Executes a fired job's action.
///
/// Errors and panics are contained by the scheduler: they mark the job
/// `Failed` and are logged, nothing else.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, job: &Job) -> anyhow::Result<()>;
}

/// Owns the registered jobs and drives them from a single timer loop.
///
/// Cheap to clone; every clone shares the same job table. Command handlers
/// register and cancel jobs through a clone while [`Scheduler::run`] is
/// active on another task.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    jobs: Mutex<HashMap<String, Job>>,
    /// Poked whenever the table changes so the loop can recompute its sleep.
    wake: Notify,
    /// Read side, used by [`Scheduler::restore`].
    store: Option<JobStore>,
    writer: Option<JobWriter>,
    job_timeout: Duration,
}

impl Scheduler {
    /// `store = None` keeps jobs in memory only. Otherwise changes are
    /// written behind on a dedicated thread; see [`Scheduler::flush`].
    pub fn new(store: Option<JobStore>, job_timeout: Duration) -> Self {
        let writer = store.clone().map(JobWriter::spawn);
        Self {
            inner: Arc::new(Inner {
                jobs: Mutex::new(HashMap::new()),
                wake: Notify::new(),
                store,
                writer,
                job_timeout,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Job>> {
        self.inner.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Re-hydrate jobs persisted by a previous process.
    ///
    /// Recurring jobs are re-armed from now, so slots missed while the process
    /// was down are skipped. One-shot jobs keep their instant and fire on the
    /// next loop iteration if it has already passed.
    pub fn restore(&self) -> Result<Vec<Job>> {
        let Some(store) = &self.inner.store else {
            return Ok(Vec::new());
        };
        let persisted = store.load_all()?;
        let now = Utc::now();
        let mut restored = Vec::new();
        {
            let mut jobs = self.lock();
            for mut job in persisted {
                if jobs.contains_key(&job.id) {
                    continue;
                }
                job.status = JobStatus::Pending;
                job.next_run = if job.is_recurring() {
                    if let Some(missed) = job.next_run.filter(|at| *at <= now) {
                        warn!(job_id = %job.id, missed_at = %missed, "skipping run missed while offline");
                    }
                    schedule::next_fire(&job.trigger, now)
                } else {
                    schedule::first_fire(&job.trigger, now)
                };
                if job.next_run.is_none() {
                    warn!(job_id = %job.id, "persisted job can never fire again, dropping it");
                    self.forget(&job.id);
                    continue;
                }
                self.persist(&job);
                jobs.insert(job.id.clone(), job.clone());
                restored.push(job);
            }
        }
        if !restored.is_empty() {
            info!(count = restored.len(), "restored persisted jobs");
            self.inner.wake.notify_one();
        }
        Ok(restored)
    }

    /// Add a job. Fails with `DuplicateJob` if its id is already registered.
    pub fn register(&self, mut job: Job) -> Result<Job> {
        schedule::validate(&job.trigger)?;
        let now = Utc::now();
        {
            let mut jobs = self.lock();
            if jobs.contains_key(&job.id) {
                return Err(SchedulerError::DuplicateJob { id: job.id });
            }
            job.status = JobStatus::Pending;
            job.next_run = schedule::first_fire(&job.trigger, now);
            if job.next_run.is_none() {
                return Err(SchedulerError::InvalidSchedule(format!(
                    "job {} would never fire",
                    job.id
                )));
            }
            self.persist(&job);
            jobs.insert(job.id.clone(), job.clone());
        }
        info!(
            job_id = %job.id,
            action = job.action.kind(),
            next_run = ?job.next_run,
            "job registered"
        );
        self.inner.wake.notify_one();
        Ok(job)
    }

    /// Remove a pending job. Returns `false` when the id is unknown or the job
    /// is a one-shot that is already executing.
    pub fn cancel(&self, id: &str) -> Result<bool> {
        {
            let mut jobs = self.lock();
            match jobs.get(id) {
                None => return Ok(false),
                Some(job) if job.status == JobStatus::Running && !job.is_recurring() => {
                    return Ok(false)
                }
                Some(_) => {}
            }
            self.forget(id);
            jobs.remove(id);
        }
        info!(job_id = %id, "job cancelled");
        self.inner.wake.notify_one();
        Ok(true)
    }

    pub fn get(&self, id: &str) -> Result<Job> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| SchedulerError::JobNotFound { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Snapshot of every registered job, ordered by id.
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.lock().values().cloned().collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until every job change made so far has reached the store.
    pub async fn flush(&self) {
        if let Some(writer) = &self.inner.writer {
            writer.flush().await;
        }
    }

    /// Timer loop. Runs until `shutdown` broadcasts `true` (or its sender is
    /// dropped). Never returns because of a job failure.
    pub async fn run(self, handler: Arc<dyn JobHandler>, mut shutdown: watch::Receiver<bool>) {
        info!(jobs = self.len(), "scheduler started");
        loop {
            for job in self.take_due(Utc::now()) {
                let this = self.clone();
                let handler = Arc::clone(&handler);
                tokio::spawn(async move { this.fire(job, handler).await });
            }

            let sleep_for = match self.next_wake() {
                Some(at) => (at - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .min(MAX_IDLE),
                None => MAX_IDLE,
            };

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = self.inner.wake.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    // --- private helpers ---------------------------------------------------

    fn next_wake(&self) -> Option<DateTime<Utc>> {
        self.lock().values().filter_map(|j| j.next_run).min()
    }

    /// Mark every job due at `now` as running and advance its schedule.
    fn take_due(&self, now: DateTime<Utc>) -> Vec<Job> {
        let mut due = Vec::new();
        let mut jobs = self.lock();
        for job in jobs.values_mut() {
            if !job.next_run.is_some_and(|at| at <= now) {
                continue;
            }
            if job.status == JobStatus::Running {
                warn!(job_id = %job.id, "previous run still in progress, skipping this slot");
                job.next_run = schedule::next_fire(&job.trigger, now);
                continue;
            }
            job.status = JobStatus::Running;
            job.last_run = Some(now);
            job.run_count += 1;
            job.next_run = if job.is_recurring() {
                schedule::next_fire(&job.trigger, now)
            } else {
                None
            };
            self.persist(job);
            due.push(job.clone());
        }
        due
    }

    /// Run one invocation in its own task so a panic or a stall stays there.
    async fn fire(&self, job: Job, handler: Arc<dyn JobHandler>) {
        let id = job.id.clone();
        let action = job.action.kind();
        let run = job.run_count;
        info!(job_id = %id, action, run, "executing job");

        let started = Instant::now();
        let task = tokio::spawn(async move { handler.run(&job).await });
        let abort = task.abort_handle();

        let outcome = match tokio::time::timeout(self.inner.job_timeout, task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(format!("{e:#}")),
            Ok(Err(join)) if join.is_panic() => Err("job panicked".to_string()),
            Ok(Err(join)) => Err(format!("job task cancelled: {join}")),
            Err(_) => {
                abort.abort();
                Err(format!(
                    "timed out after {}s",
                    self.inner.job_timeout.as_secs_f32()
                ))
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(()) => info!(job_id = %id, action, elapsed_ms, "job completed"),
            Err(e) => error!(job_id = %id, action, elapsed_ms, error = %e, "job failed"),
        }
        self.finish(&id, outcome.is_ok());
    }

    fn finish(&self, id: &str, succeeded: bool) {
        let mut jobs = self.lock();
        // Cancelled while running.
        let Some(job) = jobs.get_mut(id) else {
            return;
        };
        job.status = if succeeded {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };
        if job.is_recurring() {
            self.persist(job);
        } else {
            jobs.remove(id);
            self.forget(id);
        }
    }

    // Writes are queued while the table lock is held so they reach the
    // store in the order the table changed.

    fn persist(&self, job: &Job) {
        if let Some(writer) = &self.inner.writer {
            writer.upsert(job);
        }
    }

    fn forget(&self, id: &str) {
        if let Some(writer) = &self.inner.writer {
            writer.delete(id);
        }
    }
}
