use rusqlite::{Connection, Result};

/// Initialise the bot's collections. Safe to call on every startup (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    create_users_table(conn)?;
    create_group_logs_table(conn)?;
    create_pitches_table(conn)?;
    create_shoutouts_table(conn)?;
    create_challenges_table(conn)?;
    create_pitch_ratings_table(conn)?;
    create_sentiment_logs_table(conn)?;
    create_bot_logs_table(conn)?;
    Ok(())
}

fn create_users_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            user_id     INTEGER PRIMARY KEY,
            username    TEXT,
            first_name  TEXT NOT NULL,
            join_date   TEXT NOT NULL,
            last_active TEXT NOT NULL
        );",
    )
}

/// Every group message the bot sees. Feeds the weekly digests.
fn create_group_logs_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS group_logs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL,
            username    TEXT,
            text        TEXT NOT NULL,
            thread_id   INTEGER,
            timestamp   TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_group_logs_ts
            ON group_logs(timestamp);
        CREATE INDEX IF NOT EXISTS idx_group_logs_thread
            ON group_logs(thread_id, timestamp);",
    )
}

fn create_pitches_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS pitches (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL,
            username    TEXT,
            text        TEXT NOT NULL,
            likes       INTEGER NOT NULL DEFAULT 0,
            timestamp   TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_pitches_ts
            ON pitches(timestamp);",
    )
}

fn create_shoutouts_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS shoutouts (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            from_user_id INTEGER NOT NULL,
            to_username  TEXT NOT NULL,
            reason       TEXT NOT NULL,
            timestamp    TEXT NOT NULL
        );",
    )
}

fn create_challenges_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS challenges (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            text        TEXT NOT NULL,
            created_by  INTEGER NOT NULL,
            created_at  TEXT NOT NULL,
            is_active   INTEGER NOT NULL DEFAULT 1
        );
        CREATE INDEX IF NOT EXISTS idx_challenges_active
            ON challenges(is_active, created_at DESC);",
    )
}

fn create_pitch_ratings_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS pitch_ratings (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            author_id      INTEGER NOT NULL,
            average_rating REAL NOT NULL,
            total_votes    INTEGER NOT NULL,
            timestamp      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_pitch_ratings_author
            ON pitch_ratings(author_id, timestamp DESC);",
    )
}

fn create_sentiment_logs_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sentiment_logs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            week_start  TEXT NOT NULL,
            positive    INTEGER NOT NULL,
            negative    INTEGER NOT NULL,
            neutral     INTEGER NOT NULL,
            score       REAL NOT NULL,
            timestamp   TEXT NOT NULL
        );",
    )
}

/// Operational log. Never shown to the community.
fn create_bot_logs_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS bot_logs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            level       TEXT NOT NULL,
            message     TEXT NOT NULL,
            timestamp   TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_bot_logs_ts
            ON bot_logs(timestamp DESC);",
    )
}
