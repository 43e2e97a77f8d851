//! Day seeds and calendar helpers
//!
//! A `DaySeed` is the integer `year*10000 + month*100 + day`. It is distinct
//! for every calendar day and drives every "same answer all day" selection.
//! It is not a security primitive.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};

/// Deterministic per-day seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DaySeed(pub u64);

impl DaySeed {
    /// Raw seed value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DaySeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the seed for a calendar date
///
/// ```
/// use birdcast_common::time::day_seed;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
/// assert_eq!(day_seed(date).value(), 20240309);
/// ```
pub fn day_seed(date: NaiveDate) -> DaySeed {
    let year = date.year().max(0) as u64;
    DaySeed(year * 10_000 + date.month() as u64 * 100 + date.day() as u64)
}

/// 1-based day of the year
pub fn day_of_year(date: NaiveDate) -> u32 {
    date.ordinal()
}

/// Index used to rotate the global fallback list: `year*365 + dayOfYear`
///
/// Within one year consecutive days differ by one, so a list of length `n`
/// repeats every `n` days. Jan 1 after a leap year shares its index with
/// Dec 31, so the rotation stalls for one day there.
pub fn fallback_day_index(date: NaiveDate) -> u64 {
    date.year().max(0) as u64 * 365 + day_of_year(date) as u64
}

/// The calendar day before `date`
pub fn yesterday(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(date)
}

/// Today's date in the process-local timezone
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Today's date for a listener at a fixed UTC offset (minutes east of UTC)
pub fn date_at_offset(now: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    match chrono::FixedOffset::east_opt(utc_offset_minutes * 60) {
        Some(offset) => now.with_timezone(&offset).date_naive(),
        None => now.date_naive(),
    }
}

/// Westernmost civil UTC offset in use, in minutes
pub const WESTERNMOST_OFFSET_MINUTES: i32 = -12 * 60;

/// Easternmost civil UTC offset in use, in minutes
pub const EASTERNMOST_OFFSET_MINUTES: i32 = 14 * 60;

/// The oldest date that is still "today" for some listener
pub fn earliest_listener_date(now: DateTime<Utc>) -> NaiveDate {
    date_at_offset(now, WESTERNMOST_OFFSET_MINUTES)
}

/// Every date that is "today" somewhere at `now`, oldest first
pub fn listener_dates(now: DateTime<Utc>) -> Vec<NaiveDate> {
    let latest = date_at_offset(now, EASTERNMOST_OFFSET_MINUTES);
    earliest_listener_date(now)
        .iter_days()
        .take_while(|d| *d <= latest)
        .collect()
}

/// Time until the next midnight at a fixed UTC offset
pub fn until_midnight_at_offset(now: DateTime<Utc>, utc_offset_minutes: i32) -> std::time::Duration {
    match chrono::FixedOffset::east_opt(utc_offset_minutes * 60) {
        Some(offset) => until_next_midnight(&now.with_timezone(&offset)),
        None => until_next_midnight(&now),
    }
}

/// Time remaining until the next midnight in the timezone of `now`
///
/// Always strictly positive so a sleeping loop cannot spin.
pub fn until_next_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> std::time::Duration {
    let tomorrow = now.date_naive().succ_opt().unwrap_or_else(|| now.date_naive());
    let midnight = tomorrow.and_hms_opt(0, 0, 0).unwrap_or_default();
    let remaining = match now.timezone().from_local_datetime(&midnight).earliest() {
        Some(next) => next.signed_duration_since(now.clone()),
        None => Duration::hours(24),
    };
    remaining
        .to_std()
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or(std::time::Duration::from_secs(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_seed_layout() {
        assert_eq!(day_seed(date(2025, 1, 1)).value(), 20250101);
        assert_eq!(day_seed(date(2025, 12, 31)).value(), 20251231);
    }

    #[test]
    fn test_day_seed_distinct_across_year() {
        let mut seen = std::collections::HashSet::new();
        let mut d = date(2024, 1, 1);
        while d.year() == 2024 {
            assert!(seen.insert(day_seed(d)), "duplicate seed for {}", d);
            d = d.succ_opt().unwrap();
        }
        assert_eq!(seen.len(), 366);
    }

    #[test]
    fn test_fallback_day_index() {
        assert_eq!(fallback_day_index(date(2024, 1, 1)), 2024 * 365 + 1);
        assert_eq!(fallback_day_index(date(2024, 2, 1)), 2024 * 365 + 32);
    }

    #[test]
    fn test_yesterday() {
        assert_eq!(yesterday(date(2024, 3, 1)), date(2024, 2, 29));
    }

    #[test]
    fn test_date_at_offset_crosses_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 23, 30, 0).unwrap();
        assert_eq!(date_at_offset(now, 0), date(2024, 6, 1));
        assert_eq!(date_at_offset(now, 60), date(2024, 6, 2));
        assert_eq!(date_at_offset(now, -300), date(2024, 6, 1));
    }

    #[test]
    fn test_listener_dates_span_every_offset() {
        // 00:30 UTC: Pacific listeners are still on the previous day
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 0, 30, 0).unwrap();
        assert_eq!(earliest_listener_date(now), date(2024, 6, 1));
        assert_eq!(listener_dates(now), vec![date(2024, 6, 1), date(2024, 6, 2)]);

        // 11:00 UTC: UTC-12 is on the 1st, UTC+14 already on the 3rd
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 11, 0, 0).unwrap();
        assert_eq!(
            listener_dates(now),
            vec![date(2024, 6, 1), date(2024, 6, 2), date(2024, 6, 3)]
        );
        for offset in [-720, -480, 0, 330, 840] {
            assert!(listener_dates(now).contains(&date_at_offset(now, offset)));
        }
    }

    #[test]
    fn test_until_midnight_at_offset() {
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 11, 0, 0).unwrap();
        // UTC-12 reaches midnight at 12:00 UTC
        assert_eq!(
            until_midnight_at_offset(now, WESTERNMOST_OFFSET_MINUTES),
            std::time::Duration::from_secs(3600)
        );
        // UTC+14 reaches midnight at 10:00 UTC the next day
        assert_eq!(
            until_midnight_at_offset(now, EASTERNMOST_OFFSET_MINUTES),
            std::time::Duration::from_secs(23 * 3600)
        );
    }

    #[test]
    fn test_until_next_midnight() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let now = tz.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap();
        assert_eq!(until_next_midnight(&now), std::time::Duration::from_secs(3600));

        let at_midnight = tz.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            until_next_midnight(&at_midnight),
            std::time::Duration::from_secs(86_400)
        );
    }
}
