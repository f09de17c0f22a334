//! Payroll period model.
//!
//! This module contains the [`PayrollPeriod`] type that scopes a payroll job
//! run and the date arithmetic the eligibility stage needs.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Represents the inclusive date window a payroll job runs for.
///
/// # Example
///
/// ```
/// use contribution_engine::models::PayrollPeriod;
/// use chrono::NaiveDate;
///
/// let period = PayrollPeriod::new(
///     NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
/// )
/// .unwrap();
///
/// assert!(period.contains_date(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayrollPeriod {
    /// The start date of the period (inclusive).
    pub start_date: NaiveDate,
    /// The end date of the period (inclusive).
    pub end_date: NaiveDate,
}

impl PayrollPeriod {
    /// Creates a period, rejecting windows that end before they start.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidJobParameters`] if `end_date < start_date`.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> EngineResult<Self> {
        if end_date < start_date {
            return Err(EngineError::InvalidJobParameters {
                message: format!("period end {end_date} is before period start {start_date}"),
            });
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Checks if a given date falls within this period.
    ///
    /// The check is inclusive of both start and end dates.
    ///
    /// # Example
    ///
    /// ```
    /// use contribution_engine::models::PayrollPeriod;
    /// use chrono::NaiveDate;
    ///
    /// let period = PayrollPeriod::new(
    ///     NaiveDate::from_ymd_opt(2026, 1, 13).unwrap(),
    ///     NaiveDate::from_ymd_opt(2026, 1, 26).unwrap(),
    /// )
    /// .unwrap();
    ///
    /// assert!(period.contains_date(NaiveDate::from_ymd_opt(2026, 1, 13).unwrap())); // start date
    /// assert!(period.contains_date(NaiveDate::from_ymd_opt(2026, 1, 26).unwrap())); // end date
    /// assert!(!period.contains_date(NaiveDate::from_ymd_opt(2026, 1, 27).unwrap())); // after
    /// ```
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Stable textual key of the period, `start:end`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.start_date, self.end_date)
    }
}

/// Whole years between `from` and `to`, or 0 if `to` precedes `from`.
pub fn whole_years_between(from: NaiveDate, to: NaiveDate) -> u32 {
    whole_months_between(from, to) / 12
}

/// Whole calendar months between `from` and `to`, or 0 if `to` precedes `from`.
///
/// A month only counts once its day-of-month has been reached.
pub fn whole_months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to <= from {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// Adds calendar months, clamping to the last day of the target month.
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_january_period() -> PayrollPeriod {
        PayrollPeriod::new(date(2026, 1, 1), date(2026, 1, 31)).unwrap()
    }

    #[test]
    fn test_contains_date_within_period() {
        let period = create_january_period();
        assert!(period.contains_date(date(2026, 1, 15)));
    }

    #[test]
    fn test_contains_date_outside_period() {
        let period = create_january_period();
        assert!(!period.contains_date(date(2026, 2, 1)));
        assert!(!period.contains_date(date(2025, 12, 31)));
    }

    #[test]
    fn test_contains_date_on_boundaries() {
        let period = create_january_period();
        assert!(period.contains_date(period.start_date));
        assert!(period.contains_date(period.end_date));
    }

    #[test]
    fn test_single_day_period_is_valid() {
        let period = PayrollPeriod::new(date(2026, 3, 31), date(2026, 3, 31)).unwrap();
        assert!(period.contains_date(date(2026, 3, 31)));
    }

    #[test]
    fn test_inverted_period_is_rejected() {
        let result = PayrollPeriod::new(date(2026, 2, 1), date(2026, 1, 1));
        assert!(matches!(
            result,
            Err(EngineError::InvalidJobParameters { .. })
        ));
    }

    #[test]
    fn test_period_key() {
        assert_eq!(create_january_period().key(), "2026-01-01:2026-01-31");
    }

    #[test]
    fn test_whole_years_before_birthday() {
        assert_eq!(whole_years_between(date(2000, 6, 15), date(2026, 6, 14)), 25);
        assert_eq!(whole_years_between(date(2000, 6, 15), date(2026, 6, 15)), 26);
    }

    #[test]
    fn test_whole_months_counts_completed_months_only() {
        assert_eq!(whole_months_between(date(2025, 1, 31), date(2025, 2, 28)), 0);
        assert_eq!(whole_months_between(date(2025, 1, 15), date(2025, 2, 15)), 1);
        assert_eq!(whole_months_between(date(2024, 11, 1), date(2026, 1, 31)), 14);
    }

    #[test]
    fn test_whole_months_is_zero_for_future_start() {
        assert_eq!(whole_months_between(date(2026, 5, 1), date(2026, 1, 1)), 0);
    }

    #[test]
    fn test_add_months_clamps_month_end() {
        assert_eq!(add_months(date(2026, 1, 31), 1), date(2026, 2, 28));
        assert_eq!(add_months(date(2026, 1, 31), 6), date(2026, 7, 31));
        assert_eq!(add_months(date(2026, 1, 31), 12), date(2027, 1, 31));
    }

    #[test]
    fn test_serialize_period() {
        let json = serde_json::to_string(&create_january_period()).unwrap();
        assert!(json.contains("\"start_date\":\"2026-01-01\""));
        assert!(json.contains("\"end_date\":\"2026-01-31\""));
    }
}
