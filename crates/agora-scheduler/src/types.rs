use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use agora_core::JobAction;

/// Defines when and how often a job should run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Run exactly once at the given UTC instant.
    Once { at: DateTime<Utc> },

    /// Run repeatedly with a fixed interval in seconds.
    Interval { every_secs: u64 },

    /// Run whenever the UTC wall clock matches the pattern.
    Cron(CronPattern),
}

impl Trigger {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Trigger::Once { .. })
    }
}

/// Calendar pattern. `None` is a wildcard; `Some` must match exactly.
///
/// When both `day_of_month` and `day_of_week` are fixed, a day must satisfy
/// both.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CronPattern {
    #[serde(default)]
    pub minute: Option<u32>,
    #[serde(default)]
    pub hour: Option<u32>,
    #[serde(default)]
    pub day_of_month: Option<u32>,
    #[serde(default)]
    pub day_of_week: Option<Weekday>,
}

impl CronPattern {
    /// Every day at `hour:minute`.
    pub fn daily(hour: u32, minute: u32) -> Self {
        Self {
            minute: Some(minute),
            hour: Some(hour),
            ..Self::default()
        }
    }

    /// Every `day` at `hour:minute`.
    pub fn weekly(day: Weekday, hour: u32, minute: u32) -> Self {
        Self {
            day_of_week: Some(day),
            ..Self::daily(hour, minute)
        }
    }

    /// On day-of-month `day` at `hour:minute`.
    pub fn monthly(day: u32, hour: u32, minute: u32) -> Self {
        Self {
            day_of_month: Some(day),
            ..Self::daily(hour, minute)
        }
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for its next_run time.
    Pending,
    /// Currently being executed.
    Running,
    /// Last execution finished successfully.
    Completed,
    /// Last execution returned an error, panicked or timed out.
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// A registered job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique among currently registered jobs.
    pub id: String,
    pub trigger: Trigger,
    /// What to do when the job fires.
    pub action: JobAction,
    pub status: JobStatus,
    /// Next planned execution; `None` once a one-shot job has fired.
    pub next_run: Option<DateTime<Utc>>,
    /// Start of the most recent execution, if any.
    pub last_run: Option<DateTime<Utc>>,
    /// Number of times the job has been fired.
    pub run_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: impl Into<String>, trigger: Trigger, action: JobAction) -> Self {
        Self {
            id: id.into(),
            trigger,
            action,
            status: JobStatus::Pending,
            next_run: None,
            last_run: None,
            run_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.trigger.is_recurring()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cron_trigger_serializes_with_kind_tag() {
        let t = Trigger::Cron(CronPattern::weekly(Weekday::Mon, 10, 0));
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains(r#""kind":"cron""#));
        assert!(json.contains(r#""day_of_week":"Mon""#));
        let back: Trigger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(s.to_string().parse::<JobStatus>().unwrap(), s);
        }
        assert!("missed".parse::<JobStatus>().is_err());
    }

    #[test]
    fn only_once_is_not_recurring() {
        assert!(!Trigger::Once { at: Utc::now() }.is_recurring());
        assert!(Trigger::Interval { every_secs: 300 }.is_recurring());
        assert!(Trigger::Cron(CronPattern::monthly(1, 12, 0)).is_recurring());
    }
}
