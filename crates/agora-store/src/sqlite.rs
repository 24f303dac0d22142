use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use tracing::debug;

use agora_core::{types::format_timestamp, TimeWindow};

use crate::{
    db::init_db,
    error::{Result, StoreError},
    store::Store,
    types::*,
};

/// SQLite-backed [`Store`].
///
/// The connection sits behind a mutex and every query runs on tokio's
/// blocking pool, so a slow disk never stalls the message or timer loops.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Wrap an open connection and make sure every collection exists.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn parse_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn group_message_from_row(row: &Row<'_>) -> rusqlite::Result<GroupMessage> {
    Ok(GroupMessage {
        user_id: row.get(0)?,
        username: row.get(1)?,
        text: row.get(2)?,
        thread_id: row.get(3)?,
        at: parse_ts(row, 4)?,
    })
}

fn pitch_from_row(row: &Row<'_>) -> rusqlite::Result<Pitch> {
    Ok(Pitch {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        text: row.get(3)?,
        likes: row.get(4)?,
        at: parse_ts(row, 5)?,
    })
}

fn challenge_from_row(row: &Row<'_>) -> rusqlite::Result<Challenge> {
    Ok(Challenge {
        id: row.get(0)?,
        text: row.get(1)?,
        created_by: row.get(2)?,
        created_at: parse_ts(row, 3)?,
        is_active: row.get(4)?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_user(&self, member: &Member, at: DateTime<Utc>) -> Result<()> {
        let member = member.clone();
        let now = format_timestamp(at);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO users (user_id, username, first_name, join_date, last_active)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                    username = excluded.username,
                    first_name = excluded.first_name,
                    last_active = excluded.last_active",
                params![member.user_id, member.username, member.first_name, now],
            )?;
            Ok(())
        })
        .await
    }

    async fn log_message(&self, message: &GroupMessage) -> Result<i64> {
        let m = message.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO group_logs (user_id, username, text, thread_id, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![m.user_id, m.username, m.text, m.thread_id, format_timestamp(m.at)],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn insert_pitch(&self, pitch: &NewPitch) -> Result<i64> {
        let p = pitch.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO pitches (user_id, username, text, likes, timestamp)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![p.user_id, p.username, p.text, format_timestamp(p.at)],
            )?;
            let id = conn.last_insert_rowid();
            debug!(pitch_id = id, user_id = p.user_id, "pitch stored");
            Ok(id)
        })
        .await
    }

    async fn insert_rating(&self, rating: &RatingRecord) -> Result<i64> {
        let r = rating.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO pitch_ratings (author_id, average_rating, total_votes, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![r.author_id, r.average_rating, r.total_votes, format_timestamp(r.at)],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn insert_sentiment(&self, record: &SentimentRecord) -> Result<i64> {
        let r = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sentiment_logs
                 (week_start, positive, negative, neutral, score, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    format_timestamp(r.week_start),
                    r.positive,
                    r.negative,
                    r.neutral,
                    r.score,
                    format_timestamp(r.at),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn log_bot_event(&self, level: BotLogLevel, message: &str) -> Result<()> {
        let message = message.to_string();
        let now = format_timestamp(Utc::now());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO bot_logs (level, message, timestamp) VALUES (?1, ?2, ?3)",
                params![level.to_string(), message, now],
            )?;
            Ok(())
        })
        .await
    }

    async fn group_logs_between(
        &self,
        window: &TimeWindow,
        thread_id: Option<i32>,
    ) -> Result<Vec<GroupMessage>> {
        let start = format_timestamp(window.start);
        let end = format_timestamp(window.end);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT user_id, username, text, thread_id, timestamp FROM group_logs
                 WHERE timestamp >= ?1 AND timestamp < ?2
                   AND (?3 IS NULL OR thread_id = ?3)
                 ORDER BY timestamp, id",
            )?;
            let rows = stmt
                .query_map(params![start, end, thread_id], group_message_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn open_challenge(&self, text: &str, created_by: i64, at: DateTime<Utc>) -> Result<i64> {
        let text = text.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO challenges (text, created_by, created_at, is_active)
                 VALUES (?1, ?2, ?3, 1)",
                params![text, created_by, format_timestamp(at)],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn active_challenge_between(&self, window: &TimeWindow) -> Result<Option<Challenge>> {
        let start = format_timestamp(window.start);
        let end = format_timestamp(window.end);
        self.with_conn(move |conn| {
            let challenge = conn
                .query_row(
                    "SELECT id, text, created_by, created_at, is_active FROM challenges
                     WHERE is_active = 1 AND created_at >= ?1 AND created_at < ?2
                     ORDER BY created_at DESC, id DESC
                     LIMIT 1",
                    params![start, end],
                    challenge_from_row,
                )
                .optional()?;
            Ok(challenge)
        })
        .await
    }

    async fn deactivate_challenge(&self, id: i64) -> Result<()> {
        self.with_conn(move |conn| {
            let n = conn.execute("UPDATE challenges SET is_active = 0 WHERE id = ?1", [id])?;
            if n == 0 {
                return Err(StoreError::NotFound(format!("challenge {id}")));
            }
            Ok(())
        })
        .await
    }

    async fn pitches_between(&self, window: &TimeWindow) -> Result<Vec<Pitch>> {
        let start = format_timestamp(window.start);
        let end = format_timestamp(window.end);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, user_id, username, text, likes, timestamp FROM pitches
                 WHERE timestamp >= ?1 AND timestamp < ?2
                 ORDER BY timestamp, id",
            )?;
            let rows = stmt
                .query_map(params![start, end], pitch_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn ratings_for(&self, author_id: i64) -> Result<Vec<RatingRecord>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT author_id, average_rating, total_votes, timestamp FROM pitch_ratings
                 WHERE author_id = ?1
                 ORDER BY timestamp DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([author_id], |row| {
                    Ok(RatingRecord {
                        author_id: row.get(0)?,
                        average_rating: row.get(1)?,
                        total_votes: row.get(2)?,
                        at: parse_ts(row, 3)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn recent_bot_logs(&self, limit: u32) -> Result<Vec<BotLogEntry>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT level, message, timestamp FROM bot_logs
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok(BotLogEntry {
                        level: row.get(0)?,
                        message: row.get(1)?,
                        at: parse_ts(row, 2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn msg(user_id: i64, text: &str, thread_id: Option<i32>, at: DateTime<Utc>) -> GroupMessage {
        GroupMessage {
            user_id,
            username: Some(format!("user{user_id}")),
            text: text.to_string(),
            thread_id,
            at,
        }
    }

    #[tokio::test]
    async fn upsert_user_keeps_join_date() {
        let store = SqliteStore::open_in_memory().unwrap();
        let member = Member {
            user_id: 42,
            username: Some("ada".into()),
            first_name: "Ada".into(),
        };
        store.upsert_user(&member, t(1, 9)).await.unwrap();
        store.upsert_user(&member, t(5, 9)).await.unwrap();

        let (join, last): (String, String) = store
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT join_date, last_active FROM users WHERE user_id = 42",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(join, format_timestamp(t(1, 9)));
        assert_eq!(last, format_timestamp(t(5, 9)));
    }

    #[tokio::test]
    async fn group_log_window_is_half_open_and_filters_thread() {
        let store = SqliteStore::open_in_memory().unwrap();
        let window = TimeWindow::trailing(t(8, 0), Duration::days(7));
        store.log_message(&msg(1, "too old", Some(5), t(1, 0) - Duration::seconds(1))).await.unwrap();
        store.log_message(&msg(1, "first", Some(5), t(1, 0))).await.unwrap();
        store.log_message(&msg(2, "flood", Some(8), t(3, 0))).await.unwrap();
        store.log_message(&msg(3, "general", None, t(4, 0))).await.unwrap();
        store.log_message(&msg(2, "too new", Some(5), t(8, 0))).await.unwrap();

        let all = store.group_logs_between(&window, None).await.unwrap();
        let texts: Vec<_> = all.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["first", "flood", "general"]);

        let discussion = store.group_logs_between(&window, Some(5)).await.unwrap();
        assert_eq!(discussion.len(), 1);
        assert_eq!(discussion[0].text, "first");
    }

    #[tokio::test]
    async fn challenge_lifecycle() {
        let store = SqliteStore::open_in_memory().unwrap();
        let window = TimeWindow::trailing(t(8, 0), Duration::days(7));
        store.open_challenge("stale", 1, t(1, 0) - Duration::days(3)).await.unwrap();
        let id = store.open_challenge("ship it", 1, t(2, 0)).await.unwrap();

        let active = store.active_challenge_between(&window).await.unwrap().unwrap();
        assert_eq!(active.id, id);
        assert!(active.is_active);

        store.deactivate_challenge(id).await.unwrap();
        assert!(store.active_challenge_between(&window).await.unwrap().is_none());
        assert!(matches!(
            store.deactivate_challenge(999).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn pitches_start_with_zero_likes() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_pitch(&NewPitch {
                user_id: 7,
                username: None,
                text: "#pitch a bakery for dogs".into(),
                at: t(3, 12),
            })
            .await
            .unwrap();
        let window = TimeWindow::trailing(t(8, 0), Duration::days(30));
        let pitches = store.pitches_between(&window).await.unwrap();
        assert_eq!(pitches.len(), 1);
        assert_eq!(pitches[0].likes, 0);
        assert_eq!(pitches[0].at, t(3, 12));
    }

    #[tokio::test]
    async fn ratings_and_bot_logs_read_back_newest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        for (avg, day) in [(3.0, 1), (4.25, 2)] {
            store
                .insert_rating(&RatingRecord {
                    author_id: 42,
                    average_rating: avg,
                    total_votes: 4,
                    at: t(day, 0),
                })
                .await
                .unwrap();
        }
        let ratings = store.ratings_for(42).await.unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0].average_rating, 4.25);
        assert!(store.ratings_for(1).await.unwrap().is_empty());

        store.log_bot_event(BotLogLevel::Info, "bot started").await.unwrap();
        store.log_bot_event(BotLogLevel::Critical, "heartbeat failed").await.unwrap();
        let logs = store.recent_bot_logs(10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().any(|l| l.level == "critical"));
    }

    #[tokio::test]
    async fn sentiment_row_is_written() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .insert_sentiment(&SentimentRecord {
                week_start: t(1, 10),
                positive: 10,
                negative: 4,
                neutral: 2,
                score: 37.5,
                at: t(8, 10),
            })
            .await
            .unwrap();
        assert!(id > 0);
    }

    #[tokio::test]
    async fn timed_out_insert_is_written_once() {
        use agora_core::retry::{with_retry, RetryPolicy};
        use std::time::Duration as StdDuration;

        let path = std::env::temp_dir()
            .join(format!("agora-store-{}-locked.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let conn = Connection::open(&path).unwrap();
        conn.busy_timeout(StdDuration::from_secs(5)).unwrap();
        let store = SqliteStore::new(conn).unwrap();

        // Another process holds the write lock past the call timeout.
        let locker = Connection::open(&path).unwrap();
        locker.execute_batch("BEGIN EXCLUSIVE;").unwrap();

        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: StdDuration::from_millis(10),
            max_delay: StdDuration::from_millis(10),
            call_timeout: StdDuration::from_millis(100),
            retry_timeouts: true,
        }
        .non_idempotent();
        let rating = &RatingRecord {
            author_id: 42,
            average_rating: 4.0,
            total_votes: 3,
            at: t(1, 12),
        };
        let writer = &store;
        let out = with_retry("insert_rating", &policy, move || writer.insert_rating(rating)).await;
        assert!(matches!(out, Err(StoreError::Timeout { ms: 100 })));

        locker.execute_batch("COMMIT;").unwrap();
        // Queued behind the abandoned insert, which lands once the lock clears.
        let ratings = store.ratings_for(42).await.unwrap();
        assert_eq!(ratings.len(), 1);

        drop(store);
        drop(locker);
        let _ = std::fs::remove_file(&path);
    }
}
