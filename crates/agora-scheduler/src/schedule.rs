use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};

use crate::{
    error::{Result, SchedulerError},
    types::{CronPattern, Trigger},
};

/// How far ahead a cron search looks before declaring the pattern dead.
/// Eight years covers every day-of-month / weekday combination that can occur
/// more than once a leap cycle.
const CRON_SEARCH_DAYS: i64 = 366 * 8;

/// Check a trigger's fields before it is registered.
pub fn validate(trigger: &Trigger) -> Result<()> {
    match trigger {
        Trigger::Once { .. } => Ok(()),
        Trigger::Interval { every_secs } if *every_secs == 0 => Err(
            SchedulerError::InvalidSchedule("interval must be at least one second".into()),
        ),
        Trigger::Interval { every_secs } if interval(*every_secs).is_none() => Err(
            SchedulerError::InvalidSchedule(format!("interval of {every_secs}s is out of range")),
        ),
        Trigger::Interval { .. } => Ok(()),
        Trigger::Cron(p) => validate_pattern(p),
    }
}

fn interval(every_secs: u64) -> Option<Duration> {
    Duration::try_seconds(i64::try_from(every_secs).ok()?)
}

fn validate_pattern(p: &CronPattern) -> Result<()> {
    let check = |name: &str, v: Option<u32>, lo: u32, hi: u32| match v {
        Some(v) if v < lo || v > hi => Err(SchedulerError::InvalidSchedule(format!(
            "{name} {v} out of range {lo}..={hi}"
        ))),
        _ => Ok(()),
    };
    check("minute", p.minute, 0, 59)?;
    check("hour", p.hour, 0, 23)?;
    check("day_of_month", p.day_of_month, 1, 31)?;
    Ok(())
}

/// First execution time for a freshly registered job.
///
/// A `Once` trigger fires at its instant even if that instant has already
/// passed (it is then due immediately). Recurring triggers fire at their first
/// slot strictly after `now`.
pub fn first_fire(trigger: &Trigger, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match trigger {
        Trigger::Once { at } => Some(*at),
        other => next_fire(other, now),
    }
}

/// Compute the next UTC execution time for `trigger` strictly *after* `after`.
///
/// Returns `None` when the trigger is exhausted (a `Once` whose instant is not
/// in the future) or when a cron pattern has no matching day within the search
/// horizon (e.g. day 31 on a weekday that never lines up).
pub fn next_fire(trigger: &Trigger, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match trigger {
        Trigger::Once { at } => {
            if *at > after {
                Some(*at)
            } else {
                None
            }
        }

        Trigger::Interval { every_secs } => after.checked_add_signed(interval(*every_secs)?),

        Trigger::Cron(pattern) => next_cron(pattern, after),
    }
}

fn next_cron(p: &CronPattern, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    // Earliest candidate: the start of the minute following `after`.
    let start = after.with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
    let first_day = start.date_naive();

    for offset in 0..CRON_SEARCH_DAYS {
        let day = first_day + Duration::days(offset);
        if !day_matches(p, day) {
            continue;
        }
        let (floor_h, floor_m) = if offset == 0 {
            (start.hour(), start.minute())
        } else {
            (0, 0)
        };
        if let Some((h, m)) = first_time_on_day(p, floor_h, floor_m) {
            return day.and_hms_opt(h, m, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

fn day_matches(p: &CronPattern, day: NaiveDate) -> bool {
    p.day_of_month.map_or(true, |d| d == day.day())
        && p.day_of_week.map_or(true, |w| w == day.weekday())
}

/// Earliest `(hour, minute)` matching the pattern at or after the floor.
fn first_time_on_day(p: &CronPattern, floor_h: u32, floor_m: u32) -> Option<(u32, u32)> {
    for h in floor_h..24 {
        if p.hour.is_some_and(|want| want != h) {
            continue;
        }
        let min_floor = if h == floor_h { floor_m } else { 0 };
        match p.minute {
            Some(m) if m >= min_floor => return Some((h, m)),
            Some(_) => continue,
            None => return Some((h, min_floor)),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn monday_ten() -> Trigger {
        Trigger::Cron(CronPattern::weekly(Weekday::Mon, 10, 0))
    }

    #[test]
    fn once_fires_then_is_exhausted() {
        let t = Trigger::Once {
            at: at(2026, 3, 1, 12, 0),
        };
        assert_eq!(next_fire(&t, at(2026, 3, 1, 11, 0)), Some(at(2026, 3, 1, 12, 0)));
        assert_eq!(next_fire(&t, at(2026, 3, 1, 12, 0)), None);
        // First fire of an overdue one-shot is still its instant.
        assert_eq!(first_fire(&t, at(2026, 3, 2, 0, 0)), Some(at(2026, 3, 1, 12, 0)));
    }

    #[test]
    fn interval_adds_period() {
        let t = Trigger::Interval { every_secs: 300 };
        assert_eq!(next_fire(&t, at(2026, 3, 1, 12, 0)), Some(at(2026, 3, 1, 12, 5)));
    }

    #[test]
    fn weekly_pattern_lands_on_next_monday() {
        // 2026-03-08 is a Sunday.
        let next = next_fire(&monday_ten(), at(2026, 3, 8, 20, 0)).unwrap();
        assert_eq!(next, at(2026, 3, 9, 10, 0));
        assert_eq!(next.weekday(), Weekday::Mon);
    }

    #[test]
    fn weekly_pattern_is_strictly_after() {
        let next = next_fire(&monday_ten(), at(2026, 3, 9, 10, 0)).unwrap();
        assert_eq!(next, at(2026, 3, 16, 10, 0));
        // Same day, earlier hour still fires today.
        let next = next_fire(&monday_ten(), at(2026, 3, 9, 9, 59)).unwrap();
        assert_eq!(next, at(2026, 3, 9, 10, 0));
    }

    #[test]
    fn weekly_pattern_fires_once_per_seven_days() {
        let t = monday_ten();
        let mut cursor = at(2026, 1, 1, 0, 0);
        let mut fires = Vec::new();
        while let Some(next) = next_fire(&t, cursor) {
            if next >= at(2026, 7, 1, 0, 0) {
                break;
            }
            fires.push(next);
            cursor = next;
        }
        assert_eq!(fires.len(), 26);
        for pair in fires.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::days(7));
        }
        for f in &fires {
            assert_eq!(f.weekday(), Weekday::Mon);
            assert_eq!((f.hour(), f.minute()), (10, 0));
        }
    }

    #[test]
    fn monthly_pattern_rolls_into_next_month() {
        let t = Trigger::Cron(CronPattern::monthly(1, 12, 0));
        assert_eq!(next_fire(&t, at(2026, 1, 31, 23, 0)), Some(at(2026, 2, 1, 12, 0)));
        assert_eq!(next_fire(&t, at(2026, 12, 1, 12, 0)), Some(at(2027, 1, 1, 12, 0)));
    }

    #[test]
    fn wildcard_minute_takes_next_minute() {
        let t = Trigger::Cron(CronPattern {
            hour: Some(14),
            ..CronPattern::default()
        });
        assert_eq!(next_fire(&t, at(2026, 3, 1, 14, 30)), Some(at(2026, 3, 1, 14, 31)));
        assert_eq!(next_fire(&t, at(2026, 3, 1, 14, 59)), Some(at(2026, 3, 2, 14, 0)));
    }

    #[test]
    fn seconds_are_truncated_before_search() {
        let t = Trigger::Cron(CronPattern::daily(10, 0));
        let after = Utc.with_ymd_and_hms(2026, 3, 1, 9, 59, 42).unwrap();
        assert_eq!(next_fire(&t, after), Some(at(2026, 3, 1, 10, 0)));
    }

    #[test]
    fn both_day_fields_must_match() {
        // Friday the 13th.
        let t = Trigger::Cron(CronPattern {
            day_of_month: Some(13),
            day_of_week: Some(Weekday::Fri),
            ..CronPattern::daily(9, 0)
        });
        let next = next_fire(&t, at(2026, 1, 1, 0, 0)).unwrap();
        assert_eq!(next, at(2026, 2, 13, 9, 0));
        assert_eq!(next.weekday(), Weekday::Fri);
    }

    #[test]
    fn validation_rejects_out_of_range_fields() {
        assert!(validate(&Trigger::Interval { every_secs: 0 }).is_err());
        assert!(validate(&Trigger::Cron(CronPattern::daily(24, 0))).is_err());
        assert!(validate(&Trigger::Cron(CronPattern::daily(10, 60))).is_err());
        assert!(validate(&Trigger::Cron(CronPattern::monthly(0, 10, 0))).is_err());
        assert!(validate(&monday_ten()).is_ok());
    }

    #[test]
    fn huge_interval_is_rejected_not_panicking() {
        for every_secs in [u64::MAX, i64::MAX as u64, (i64::MAX / 1000 + 1) as u64] {
            let t = Trigger::Interval { every_secs };
            assert!(validate(&t).is_err());
            assert_eq!(next_fire(&t, at(2026, 3, 1, 12, 0)), None);
        }
        let year = Trigger::Interval { every_secs: 365 * 86_400 };
        assert!(validate(&year).is_ok());
    }
}
