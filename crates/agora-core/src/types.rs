use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Poll identifier issued by the messaging platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollId(pub String);

impl PollId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PollId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PollId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Everything needed to close and score a rating poll later on.
///
/// Owned by the poll registry while the poll is open. Also embedded in the
/// resolver job's action so the registry can be rebuilt after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollRecord {
    pub poll_id: PollId,
    pub chat_id: i64,
    pub thread_id: Option<i32>,
    pub message_id: i32,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Half-open time range `[start, end)` bounding a report's input rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The window `[now - length, now)`.
    pub fn trailing(now: DateTime<Utc>, length: Duration) -> Self {
        Self {
            start: now - length,
            end: now,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Canonical timestamp encoding for every stored row.
///
/// Fixed precision and a `Z` suffix keep lexicographic order equal to
/// chronological order, which the store's range queries rely on.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Human-readable span such as `24 hours` or `1 hour 30 minutes`.
///
/// Seconds only show when the span is under a minute.
pub fn format_duration(span: Duration) -> String {
    let secs = span.num_seconds().max(0);
    let unit = |n: i64, name: &str| format!("{n} {name}{}", if n == 1 { "" } else { "s" });
    let parts: Vec<String> = [(secs / 3600, "hour"), (secs % 3600 / 60, "minute")]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, name)| unit(n, name))
        .collect();
    if parts.is_empty() {
        return unit(secs, "second");
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn trailing_window_is_half_open() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap();
        let w = TimeWindow::trailing(now, Duration::days(7));
        assert!(w.contains(now - Duration::days(7)));
        assert!(w.contains(now - Duration::seconds(1)));
        assert!(!w.contains(now));
        assert!(!w.contains(now - Duration::days(7) - Duration::seconds(1)));
    }

    #[test]
    fn timestamps_sort_chronologically() {
        let a = Utc.with_ymd_and_hms(2026, 1, 9, 23, 59, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        assert!(format_timestamp(a) < format_timestamp(b));
        assert!(format_timestamp(b).ends_with('Z'));
    }

    #[test]
    fn durations_read_naturally() {
        assert_eq!(format_duration(Duration::hours(24)), "24 hours");
        assert_eq!(format_duration(Duration::minutes(30)), "30 minutes");
        assert_eq!(format_duration(Duration::minutes(61)), "1 hour 1 minute");
        assert_eq!(format_duration(Duration::seconds(45)), "45 seconds");
        assert_eq!(format_duration(Duration::zero()), "0 seconds");
    }
}
