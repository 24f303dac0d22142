use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AgoraError, Result},
    retry::RetryPolicy,
};

pub const DEFAULT_PORT: u16 = 8443;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_DISCUSSION_THREAD_ID: i32 = 5;
pub const DEFAULT_SIX_HANDSHAKES_THREAD_ID: i32 = 6;
pub const DEFAULT_NETWORK_THREAD_ID: i32 = 7;
pub const DEFAULT_FLOOD_THREAD_ID: i32 = 8;
pub const POLL_RESOLVE_AFTER_SECS: u64 = 24 * 60 * 60;
pub const JOB_TIMEOUT_SECS: u64 = 300;
/// Retried calls a poll resolution makes at most, each bounded by the retry policy.
pub const RESOLUTION_CALLS: u32 = 3;

/// Top-level config (agora.toml + AGORA_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgoraConfig {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub ops: OpsConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// The community supergroup every report and poll is posted to.
    pub chat_id: i64,
    /// Numeric Telegram user ids allowed to run admin commands.
    #[serde(default)]
    pub admin_ids: Vec<i64>,
    #[serde(default)]
    pub threads: ThreadsConfig,
}

/// Forum topic ids inside the community chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadsConfig {
    #[serde(default = "default_discussion_thread")]
    pub discussion: i32,
    #[serde(default = "default_six_handshakes_thread")]
    pub six_handshakes: i32,
    #[serde(default = "default_network_thread")]
    pub network: i32,
    #[serde(default = "default_flood_thread")]
    pub flood: i32,
}

impl Default for ThreadsConfig {
    fn default() -> Self {
        Self {
            discussion: DEFAULT_DISCUSSION_THREAD_ID,
            six_handshakes: DEFAULT_SIX_HANDSHAKES_THREAD_ID,
            network: DEFAULT_NETWORK_THREAD_ID,
            flood: DEFAULT_FLOOD_THREAD_ID,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Delay between opening a rating poll and resolving it.
    #[serde(default = "default_poll_resolve_after")]
    pub poll_resolve_after_secs: u64,
    /// Hard upper bound on a single job invocation.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,
    /// Write pending jobs to SQLite so they survive a restart.
    #[serde(default = "bool_true")]
    pub persist_jobs: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_resolve_after_secs: POLL_RESOLVE_AFTER_SECS,
            job_timeout_secs: JOB_TIMEOUT_SECS,
            persist_jobs: true,
        }
    }
}

/// Retry policy applied to every channel and store call made from a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

/// Operational escalation target. Never the user-facing community chat.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpsConfig {
    pub log_chat_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_discussion_thread() -> i32 {
    DEFAULT_DISCUSSION_THREAD_ID
}
fn default_six_handshakes_thread() -> i32 {
    DEFAULT_SIX_HANDSHAKES_THREAD_ID
}
fn default_network_thread() -> i32 {
    DEFAULT_NETWORK_THREAD_ID
}
fn default_flood_thread() -> i32 {
    DEFAULT_FLOOD_THREAD_ID
}
fn default_poll_resolve_after() -> u64 {
    POLL_RESOLVE_AFTER_SECS
}
fn default_job_timeout() -> u64 {
    JOB_TIMEOUT_SECS
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    5_000
}
fn default_call_timeout_ms() -> u64 {
    15_000
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.agora/agora.db", home)
}

impl AgoraConfig {
    /// Load config from a TOML file with AGORA_* env var overrides.
    ///
    /// Nested keys use a double underscore: `AGORA_TELEGRAM__BOT_TOKEN`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("AGORA_").split("__")),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: AgoraConfig = figment
            .extract()
            .map_err(|e| AgoraError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(AgoraError::Config("telegram.bot_token is empty".into()));
        }
        if self.telegram.admin_ids.is_empty() {
            return Err(AgoraError::Config(
                "telegram.admin_ids must list at least one admin".into(),
            ));
        }
        if self.ops.log_chat_id == Some(self.telegram.chat_id) {
            return Err(AgoraError::Config(
                "ops.log_chat_id must not be the community chat".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(AgoraError::Config("retry.max_attempts must be >= 1".into()));
        }
        let budget = RetryPolicy::from(&self.retry).worst_case() * RESOLUTION_CALLS;
        if Duration::from_secs(self.scheduler.job_timeout_secs) <= budget {
            return Err(AgoraError::Config(format!(
                "scheduler.job_timeout_secs ({}) must exceed the retry budget \
                 of a poll resolution ({:.1}s)",
                self.scheduler.job_timeout_secs,
                budget.as_secs_f64()
            )));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.agora/agora.toml", home)
}
