use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use agora_core::types::format_timestamp;

use crate::{
    error::Result,
    types::{Job, JobStatus},
};

/// Initialise the scheduler schema in `conn`.
///
/// Creates the `scheduled_jobs` table (idempotent) and an index on `next_run`.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS scheduled_jobs (
            id          TEXT    NOT NULL PRIMARY KEY,
            schedule    TEXT    NOT NULL,   -- JSON-encoded Trigger
            action      TEXT    NOT NULL,   -- JSON-encoded JobAction
            status      TEXT    NOT NULL DEFAULT 'pending',
            next_run    TEXT,               -- RFC 3339 or NULL
            last_run    TEXT,               -- RFC 3339 or NULL
            run_count   INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_scheduled_jobs_next_run ON scheduled_jobs (next_run);
        ",
    )?;
    Ok(())
}

/// SQLite rows for registered jobs.
///
/// Shares its `Connection` behind a mutex with nothing else, so the caller
/// should hand it a dedicated connection to the bot database. The scheduler
/// only writes through its writer thread.
#[derive(Clone)]
pub struct JobStore {
    conn: Arc<Mutex<Connection>>,
}

impl JobStore {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or replace the row for `job`.
    pub fn upsert(&self, job: &Job) -> Result<()> {
        let trigger = serde_json::to_string(&job.trigger)?;
        let action = serde_json::to_string(&job.action)?;
        self.lock().execute(
            "INSERT INTO scheduled_jobs
             (id, schedule, action, status, next_run, last_run, run_count, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
             ON CONFLICT(id) DO UPDATE SET
                schedule=excluded.schedule, action=excluded.action,
                status=excluded.status, next_run=excluded.next_run,
                last_run=excluded.last_run, run_count=excluded.run_count",
            params![
                job.id,
                trigger,
                action,
                job.status.to_string(),
                job.next_run.map(format_timestamp),
                job.last_run.map(format_timestamp),
                job.run_count,
                format_timestamp(job.created_at),
            ],
        )?;
        Ok(())
    }

    /// Delete the row for `id`. Returns `true` if a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let n = self
            .lock()
            .execute("DELETE FROM scheduled_jobs WHERE id = ?1", [id])?;
        Ok(n > 0)
    }

    /// Fetch one job by id.
    pub fn get(&self, id: &str) -> Result<Option<Job>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, schedule, action, status, next_run, last_run, run_count, created_at
                 FROM scheduled_jobs WHERE id = ?1",
                [id],
                read_row,
            )
            .optional()?;
        Ok(row.and_then(decode))
    }

    /// Every persisted job, ordered by id. Rows that no longer decode are
    /// skipped with a warning.
    pub fn load_all(&self) -> Result<Vec<Job>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, schedule, action, status, next_run, last_run, run_count, created_at
             FROM scheduled_jobs ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], read_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().filter_map(decode).collect())
    }
}

struct RawJob {
    id: String,
    trigger: String,
    action: String,
    status: String,
    next_run: Option<String>,
    last_run: Option<String>,
    run_count: u32,
    created_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawJob> {
    Ok(RawJob {
        id: row.get(0)?,
        trigger: row.get(1)?,
        action: row.get(2)?,
        status: row.get(3)?,
        next_run: row.get(4)?,
        last_run: row.get(5)?,
        run_count: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn decode(raw: RawJob) -> Option<Job> {
    let trigger = match serde_json::from_str(&raw.trigger) {
        Ok(t) => t,
        Err(e) => {
            warn!(job_id = %raw.id, "skipping job with bad trigger JSON: {e}");
            return None;
        }
    };
    let action = match serde_json::from_str(&raw.action) {
        Ok(a) => a,
        Err(e) => {
            warn!(job_id = %raw.id, "skipping job with bad action JSON: {e}");
            return None;
        }
    };
    Some(Job {
        status: raw.status.parse().unwrap_or(JobStatus::Pending),
        next_run: raw.next_run.as_deref().and_then(parse_ts),
        last_run: raw.last_run.as_deref().and_then(parse_ts),
        created_at: parse_ts(&raw.created_at).unwrap_or_else(Utc::now),
        run_count: raw.run_count,
        id: raw.id,
        trigger,
        action,
    })
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CronPattern, Trigger};
    use agora_core::JobAction;
    use chrono::{TimeZone, Weekday};

    #[test]
    fn upsert_then_load() {
        let store = JobStore::open_in_memory().unwrap();
        let mut job = Job::new(
            "sentiment_digest",
            Trigger::Cron(CronPattern::weekly(Weekday::Mon, 10, 0)),
            JobAction::SentimentDigest,
        );
        job.next_run = Some(Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap());
        store.upsert(&job).unwrap();

        job.run_count = 4;
        job.status = JobStatus::Completed;
        store.upsert(&job).unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].run_count, 4);
        assert_eq!(all[0].status, JobStatus::Completed);
        assert_eq!(all[0].next_run, job.next_run);
        assert_eq!(all[0].action, JobAction::SentimentDigest);
    }

    #[test]
    fn delete_reports_whether_row_existed() {
        let store = JobStore::open_in_memory().unwrap();
        let job = Job::new(
            "heartbeat",
            Trigger::Interval { every_secs: 300 },
            JobAction::Heartbeat,
        );
        store.upsert(&job).unwrap();
        assert!(store.get("heartbeat").unwrap().is_some());
        assert!(store.delete("heartbeat").unwrap());
        assert!(!store.delete("heartbeat").unwrap());
        assert!(store.get("heartbeat").unwrap().is_none());
    }

    #[test]
    fn undecodable_rows_are_skipped() {
        let store = JobStore::open_in_memory().unwrap();
        store
            .lock()
            .execute(
                "INSERT INTO scheduled_jobs (id, schedule, action, status, created_at)
                 VALUES ('broken', '{}', '{\"kind\":\"nope\"}', 'pending', '2026-01-01T00:00:00.000Z')",
                [],
            )
            .unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }
}
