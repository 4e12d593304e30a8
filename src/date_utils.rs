//! Date utility functions for calendar day calculations
//!
//! All arithmetic is in plain calendar days: no weekend or holiday
//! calendar is modeled.

use chrono::{Duration, NaiveDate};

/// Signed whole days from `start` to `end`
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// `date` moved by `days`, or `None` when the result leaves chrono's range
pub fn checked_add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|delta| date.checked_add_signed(delta))
}

/// Add a signed number of whole days to a date. Out-of-range results keep `date`.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    checked_add_days(date, days).unwrap_or(date)
}

/// Every calendar day from `start` for `days` days
pub fn day_range(start: NaiveDate, days: i64) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take(days.max(0) as usize)
}

/// Fraction of the span `[start, end]` elapsed at `date`, clamped to 0..=1.
/// A zero-length span counts as complete once `date` reaches it.
pub fn elapsed_fraction(start: NaiveDate, end: NaiveDate, date: NaiveDate) -> f64 {
    if date >= end {
        return 1.0;
    }
    if date < start {
        return 0.0;
    }
    let span = days_between(start, end) as f64;
    if span <= 0.0 {
        return 1.0;
    }
    (days_between(start, date) as f64 / span).clamp(0.0, 1.0)
}

/// Get today's date
pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn days_between_is_signed() {
        assert_eq!(days_between(d("2024-01-01"), d("2024-01-10")), 9);
        assert_eq!(days_between(d("2024-01-10"), d("2024-01-01")), -9);
        assert_eq!(days_between(d("2024-02-28"), d("2024-03-01")), 2);
    }

    #[test]
    fn huge_offsets_do_not_panic() {
        let origin = d("2024-01-01");
        assert_eq!(checked_add_days(origin, 4), Some(d("2024-01-05")));
        assert_eq!(checked_add_days(origin, i64::MAX), None);
        assert_eq!(checked_add_days(origin, 200_000_000_000_000), None);
        assert_eq!(add_days(origin, i64::MIN), origin);
    }

    #[test]
    fn day_range_counts_days() {
        let days: Vec<_> = day_range(d("2024-01-30"), 3).collect();
        assert_eq!(days, vec![d("2024-01-30"), d("2024-01-31"), d("2024-02-01")]);
        assert_eq!(day_range(d("2024-01-30"), -2).count(), 0);
    }

    #[test]
    fn elapsed_fraction_is_linear_and_clamped() {
        let (start, end) = (d("2024-01-01"), d("2024-01-11"));
        assert_eq!(elapsed_fraction(start, end, d("2023-12-31")), 0.0);
        assert_eq!(elapsed_fraction(start, end, start), 0.0);
        assert!((elapsed_fraction(start, end, d("2024-01-06")) - 0.5).abs() < 1e-9);
        assert_eq!(elapsed_fraction(start, end, end), 1.0);
        assert_eq!(elapsed_fraction(start, start, start), 1.0);
    }
}
