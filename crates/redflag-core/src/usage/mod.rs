//! Day/month usage bookkeeping.
//!
//! Counters are keyed by the UTC day (`YYYY-MM-DD`) and month (`YYYY-MM`)
//! they were last written in. Reading a counter whose key is stale yields
//! zero for that window, so no reset job is needed.

pub mod service;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use redflag_types::error::UsageError;
use redflag_types::usage::{UsageCounter, UsageLimits, UsageSnapshot};
use redflag_types::user::UserId;

pub fn day_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

pub fn month_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

/// Start of the next UTC day.
pub fn next_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .succ_opt()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or(now + Duration::days(1))
}

/// Start of the first day of the next UTC month.
pub fn next_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or(now + Duration::days(31))
}

pub fn new_counter(user_id: UserId, now: DateTime<Utc>) -> UsageCounter {
    UsageCounter {
        user_id,
        day_key: day_key(now),
        day_count: 0,
        month_key: month_key(now),
        month_count: 0,
    }
}

/// The counter as it applies at `now`: stale windows are zeroed.
pub fn rolled(counter: &UsageCounter, now: DateTime<Utc>) -> UsageCounter {
    let today = day_key(now);
    let this_month = month_key(now);
    UsageCounter {
        user_id: counter.user_id,
        day_count: if counter.day_key == today { counter.day_count } else { 0 },
        day_key: today,
        month_count: if counter.month_key == this_month { counter.month_count } else { 0 },
        month_key: this_month,
    }
}

pub fn snapshot(counter: &UsageCounter, limits: UsageLimits, now: DateTime<Utc>) -> UsageSnapshot {
    let current = rolled(counter, now);
    UsageSnapshot {
        used_today: current.day_count,
        daily_limit: limits.daily,
        used_this_month: current.month_count,
        monthly_limit: limits.monthly,
        day_resets_at: next_day_start(now),
        month_resets_at: next_month_start(now),
    }
}

/// Reject when either window is exhausted. The daily window is checked first.
pub fn check(
    counter: &UsageCounter,
    limits: UsageLimits,
    now: DateTime<Utc>,
) -> Result<UsageSnapshot, UsageError> {
    let snap = snapshot(counter, limits, now);
    if snap.used_today >= limits.daily {
        return Err(UsageError::DailyLimitReached {
            limit: limits.daily,
            resets_at: snap.day_resets_at,
        });
    }
    if snap.used_this_month >= limits.monthly {
        return Err(UsageError::MonthlyLimitReached {
            limit: limits.monthly,
            resets_at: snap.month_resets_at,
        });
    }
    Ok(snap)
}

/// Count one action at `now`.
pub fn record(counter: &UsageCounter, now: DateTime<Utc>) -> UsageCounter {
    increment(Some(counter), counter.user_id, &day_key(now), &month_key(now))
}

/// Count one action in the given windows. A window whose key differs from
/// the stored one restarts at 1. Repositories apply the same rule atomically.
pub fn increment(
    counter: Option<&UsageCounter>,
    user_id: UserId,
    day_key: &str,
    month_key: &str,
) -> UsageCounter {
    let day_count = counter
        .filter(|c| c.day_key == day_key)
        .map_or(0, |c| c.day_count);
    let month_count = counter
        .filter(|c| c.month_key == month_key)
        .map_or(0, |c| c.month_count);
    UsageCounter {
        user_id,
        day_key: day_key.to_string(),
        day_count: day_count.saturating_add(1),
        month_key: month_key.to_string(),
        month_count: month_count.saturating_add(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    const LIMITS: UsageLimits = UsageLimits { daily: 2, monthly: 3 };

    #[test]
    fn test_keys() {
        let now = at(2026, 3, 7, 15);
        assert_eq!(day_key(now), "2026-03-07");
        assert_eq!(month_key(now), "2026-03");
    }

    #[test]
    fn test_reset_boundaries() {
        assert_eq!(next_day_start(at(2026, 2, 28, 23)), at(2026, 3, 1, 0));
        assert_eq!(next_month_start(at(2026, 12, 31, 12)), at(2027, 1, 1, 0));
        assert_eq!(next_month_start(at(2026, 1, 15, 0)), at(2026, 2, 1, 0));
    }

    #[test]
    fn test_record_increments_both() {
        let now = at(2026, 5, 1, 9);
        let counter = record(&new_counter(UserId::new(), now), now);
        assert_eq!(counter.day_count, 1);
        assert_eq!(counter.month_count, 1);
    }

    #[test]
    fn test_increment_restarts_stale_windows() {
        let user_id = UserId::new();
        let first = increment(None, user_id, "2026-05-31", "2026-05");
        assert_eq!((first.day_count, first.month_count), (1, 1));

        let same_day = increment(Some(&first), user_id, "2026-05-31", "2026-05");
        assert_eq!((same_day.day_count, same_day.month_count), (2, 2));

        let next_day = increment(Some(&same_day), user_id, "2026-06-01", "2026-06");
        assert_eq!((next_day.day_count, next_day.month_count), (1, 1));
        assert_eq!(next_day.day_key, "2026-06-01");
    }

    #[test]
    fn test_daily_limit_then_next_day() {
        let day1 = at(2026, 5, 10, 9);
        let mut counter = new_counter(UserId::new(), day1);
        counter = record(&counter, day1);
        counter = record(&counter, day1);

        let err = check(&counter, LIMITS, day1).unwrap_err();
        match err {
            UsageError::DailyLimitReached { limit, resets_at } => {
                assert_eq!(limit, 2);
                assert_eq!(resets_at, at(2026, 5, 11, 0));
            }
            other => panic!("unexpected {other:?}"),
        }

        // Next day: daily window rolled, month still counts 2 of 3.
        let day2 = at(2026, 5, 11, 8);
        let snap = check(&counter, LIMITS, day2).unwrap();
        assert_eq!(snap.used_today, 0);
        assert_eq!(snap.used_this_month, 2);
        assert_eq!(snap.remaining_today(), 1);

        counter = record(&counter, day2);
        let err = check(&counter, LIMITS, day2).unwrap_err();
        assert!(matches!(err, UsageError::MonthlyLimitReached { limit: 3, .. }));
    }

    #[test]
    fn test_new_month_resets_month_count() {
        let jan = at(2026, 1, 31, 22);
        let mut counter = new_counter(UserId::new(), jan);
        for _ in 0..3 {
            counter = record(&counter, jan);
        }
        let feb = at(2026, 2, 1, 1);
        let snap = check(&counter, LIMITS, feb).unwrap();
        assert_eq!(snap.used_today, 0);
        assert_eq!(snap.used_this_month, 0);
    }

    #[test]
    fn test_zero_limit_blocks_immediately() {
        let now = at(2026, 6, 1, 0);
        let limits = UsageLimits { daily: 0, monthly: 10 };
        assert!(check(&new_counter(UserId::new(), now), limits, now).is_err());
    }
}
