//! Week windows in the cohort's local civil calendar.
//!
//! Weeks start on Sunday at 00:00 local time, where local time is a fixed
//! UTC-3 offset with no daylight saving. All returned instants are UTC so
//! they compare directly against stored timestamps.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;

/// Offset of the local calendar from UTC, in seconds (UTC-3).
pub const LOCAL_OFFSET_SECS: i32 = -3 * 3600;

/// An inclusive range of instants: `from <= t <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }

    /// Every instant that can be stored.
    pub fn all_time() -> Self {
        Self {
            from: DateTime::<Utc>::MIN_UTC,
            to: DateTime::<Utc>::MAX_UTC,
        }
    }

    /// `[from 00:00:00, to 23:59:59]` where both dates are local calendar days.
    ///
    /// `None` when either bound falls outside the representable range.
    pub fn local_days(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        let start = checked_local_midnight(from)?;
        let end = checked_local_midnight(to.succ_opt()?)?
            .checked_sub_signed(Duration::seconds(1))?;
        Some(Self {
            from: start,
            to: end,
        })
    }

    pub fn period(&self) -> Period {
        Period {
            start: format_local_date(self.from),
            end: format_local_date(self.to),
        }
    }
}

/// Human-readable window boundaries, `dd/mm/YYYY` in the local calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: String,
    pub end: String,
}

/// The UTC instant of 00:00 local on the most recent Sunday on or before `now`.
pub fn week_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let local = to_local(now);
    let days_since_sunday = i64::from(local.weekday().num_days_from_sunday());
    let sunday = local.date() - Duration::days(days_since_sunday);
    local_midnight(sunday)
}

/// Sunday 00:00:00 through Saturday 23:59:59 of the week containing `now`.
pub fn current_week(now: DateTime<Utc>) -> TimeWindow {
    let start = week_start(now);
    TimeWindow {
        from: start,
        to: start + Duration::days(7) - Duration::seconds(1),
    }
}

/// `[week_start - 7d, week_start - 1s]`.
pub fn last_week(now: DateTime<Utc>) -> TimeWindow {
    let start = week_start(now);
    TimeWindow {
        from: start - Duration::days(7),
        to: start - Duration::seconds(1),
    }
}

/// Local calendar date on which `at` falls.
pub fn local_date(at: DateTime<Utc>) -> NaiveDate {
    to_local(at).date()
}

pub fn format_local_date(at: DateTime<Utc>) -> String {
    local_date(at).format("%d/%m/%Y").to_string()
}

fn to_local(at: DateTime<Utc>) -> NaiveDateTime {
    at.naive_utc() + Duration::seconds(i64::from(LOCAL_OFFSET_SECS))
}

fn checked_local_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    let local = date.and_time(NaiveTime::MIN);
    local
        .checked_sub_signed(Duration::seconds(i64::from(LOCAL_OFFSET_SECS)))
        .map(|utc| utc.and_utc())
}

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    (local - Duration::seconds(i64::from(LOCAL_OFFSET_SECS))).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn midweek_resolves_to_previous_sunday() {
        // Wednesday 2024-05-15 12:00 UTC is 09:00 local, week began Sunday 2024-05-12.
        let start = week_start(utc(2024, 5, 15, 12, 0, 0));
        assert_eq!(start, utc(2024, 5, 12, 3, 0, 0));
    }

    #[test]
    fn sunday_early_utc_still_belongs_to_previous_local_week() {
        // Sunday 02:30 UTC is Saturday 23:30 local.
        let start = week_start(utc(2024, 5, 19, 2, 30, 0));
        assert_eq!(start, utc(2024, 5, 12, 3, 0, 0));
    }

    #[test]
    fn exact_local_midnight_sunday_starts_new_week() {
        let now = utc(2024, 5, 19, 3, 0, 0);
        assert_eq!(week_start(now), now);
    }

    #[test]
    fn week_start_is_idempotent_and_bounded() {
        let mut now = utc(2024, 1, 1, 0, 0, 0);
        for _ in 0..400 {
            let start = week_start(now);
            assert_eq!(start, week_start(now));
            assert!(start <= now);
            assert!(now - start < Duration::days(7));
            assert_eq!(week_start(start), start);
            now += Duration::minutes(97);
        }
    }

    #[test]
    fn last_week_ends_one_second_before_current_week() {
        let now = utc(2024, 5, 15, 12, 0, 0);
        let last = last_week(now);
        let current = current_week(now);
        assert_eq!(last.from, utc(2024, 5, 5, 3, 0, 0));
        assert_eq!(last.to, utc(2024, 5, 12, 2, 59, 59));
        assert_eq!(last.to + Duration::seconds(1), current.from);
        assert!(!last.contains(current.from));
        assert!(current.contains(current.from));
    }

    #[test]
    fn period_is_formatted_in_local_calendar() {
        let period = last_week(utc(2024, 5, 15, 12, 0, 0)).period();
        assert_eq!(period.start, "05/05/2024");
        assert_eq!(period.end, "11/05/2024");
    }

    #[test]
    fn local_days_cover_whole_local_dates() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let window = TimeWindow::local_days(day, day).unwrap();
        assert_eq!(window.from, utc(2024, 5, 15, 3, 0, 0));
        assert_eq!(window.to, utc(2024, 5, 16, 2, 59, 59));
    }

    #[test]
    fn local_days_at_calendar_edges_are_refused() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        assert!(TimeWindow::local_days(day, NaiveDate::MAX).is_none());
        assert!(TimeWindow::local_days(NaiveDate::MAX, NaiveDate::MAX).is_none());
        assert!(TimeWindow::local_days(NaiveDate::MIN, day).is_some());
    }
}
