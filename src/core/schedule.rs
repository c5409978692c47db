//! Occurrence generation - maps a recurrence rule to a bounded list of due dates.
//!
//! Everything here is pure: no database, no clock. Callers validate the raw
//! recurrence type and custom interval into a [`Recurrence`] first, after which
//! [`generate`] cannot fail. An empty result is a normal outcome, for example when
//! the series was cut off before it started.

use crate::errors::{Error, Result};
use chrono::{DateTime, Days, Months, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How often a bill repeats, as stored on the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    /// Due once, on the start date
    None,
    /// Every 7 days
    Weekly,
    /// Every calendar month
    Monthly,
    /// Every 3 calendar months
    Quarterly,
    /// Every calendar year
    Yearly,
    /// Every `custom_interval_days` days
    Custom,
}

impl RecurrenceType {
    /// Storage representation used in the `recurrence_type` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            "custom" => Ok(Self::Custom),
            other => Err(Error::Config {
                message: format!("Unknown recurrence type '{other}'"),
            }),
        }
    }
}

/// A validated recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    /// Single occurrence on the start date
    Once,
    /// Every 7 days
    Weekly,
    /// Every calendar month
    Monthly,
    /// Every 3 calendar months
    Quarterly,
    /// Every calendar year
    Yearly,
    /// Every N days, N > 0
    EveryDays(u32),
}

impl Recurrence {
    /// Combines a recurrence type with its optional custom interval.
    ///
    /// # Errors
    /// Returns `Error::Config` when `Custom` has no interval or a non-positive one,
    /// or when any other type carries an interval.
    pub fn new(kind: RecurrenceType, custom_interval_days: Option<i32>) -> Result<Self> {
        match (kind, custom_interval_days) {
            (RecurrenceType::Custom, Some(days)) if days > 0 => {
                Ok(Self::EveryDays(days.unsigned_abs()))
            }
            (RecurrenceType::Custom, Some(days)) => Err(Error::Config {
                message: format!("Custom recurrence interval must be positive, got {days}"),
            }),
            (RecurrenceType::Custom, None) => Err(Error::Config {
                message: "Custom recurrence requires an interval in days".to_string(),
            }),
            (other, Some(_)) => Err(Error::Config {
                message: format!("Recurrence '{other}' does not take a custom interval"),
            }),
            (RecurrenceType::None, None) => Ok(Self::Once),
            (RecurrenceType::Weekly, None) => Ok(Self::Weekly),
            (RecurrenceType::Monthly, None) => Ok(Self::Monthly),
            (RecurrenceType::Quarterly, None) => Ok(Self::Quarterly),
            (RecurrenceType::Yearly, None) => Ok(Self::Yearly),
        }
    }

    /// Parses the stored column pair of a series.
    pub fn from_stored(recurrence_type: &str, custom_interval_days: Option<i32>) -> Result<Self> {
        Self::new(recurrence_type.parse()?, custom_interval_days)
    }

    /// The recurrence type this rule was built from.
    #[must_use]
    pub const fn kind(self) -> RecurrenceType {
        match self {
            Self::Once => RecurrenceType::None,
            Self::Weekly => RecurrenceType::Weekly,
            Self::Monthly => RecurrenceType::Monthly,
            Self::Quarterly => RecurrenceType::Quarterly,
            Self::Yearly => RecurrenceType::Yearly,
            Self::EveryDays(_) => RecurrenceType::Custom,
        }
    }

    /// The custom interval as stored, `None` for every non-custom rule.
    #[must_use]
    pub fn custom_interval_days(self) -> Option<i32> {
        match self {
            Self::EveryDays(days) => i32::try_from(days).ok(),
            _ => None,
        }
    }

    /// The `n`-th occurrence counted from `start` (`n = 0` is `start` itself).
    ///
    /// Month-based steps are measured from `start` rather than from the previous
    /// occurrence, so a due day clamped by a short month comes back afterwards.
    /// Returns `None` past the last occurrence or on calendar overflow.
    fn nth(self, start: NaiveDate, n: u32) -> Option<NaiveDate> {
        match self {
            Self::Once => (n == 0).then_some(start),
            Self::Weekly => start.checked_add_days(Days::new(7 * u64::from(n))),
            Self::Monthly => start.checked_add_months(Months::new(n)),
            Self::Quarterly => start.checked_add_months(Months::new(n.checked_mul(3)?)),
            Self::Yearly => start.checked_add_months(Months::new(n.checked_mul(12)?)),
            Self::EveryDays(days) => {
                start.checked_add_days(Days::new(u64::from(days) * u64::from(n)))
            }
        }
    }
}

/// Strips time-of-day, keeping the calendar day in the timestamp's own zone.
#[must_use]
pub fn calendar_day<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> NaiveDate {
    timestamp.date_naive()
}

/// Generates every due date from `start` up to and including
/// `min(horizon, stop)`, in ascending order.
#[must_use]
pub fn generate(
    start: NaiveDate,
    recurrence: Recurrence,
    horizon: NaiveDate,
    stop: Option<NaiveDate>,
) -> Vec<NaiveDate> {
    if stop.is_some_and(|stop| stop < start) {
        return Vec::new();
    }
    let limit = stop.map_or(horizon, |stop| stop.min(horizon));

    let mut dates = Vec::new();
    for n in 0..=u32::MAX {
        match recurrence.nth(start, n) {
            Some(date) if date <= limit => dates.push(date),
            _ => break,
        }
    }
    dates
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_custom_thirty_days() {
        let dates = generate(
            date(2026, 1, 1),
            Recurrence::new(RecurrenceType::Custom, Some(30)).unwrap(),
            date(2026, 4, 6),
            None,
        );
        assert_eq!(
            dates,
            vec![
                date(2026, 1, 1),
                date(2026, 1, 31),
                date(2026, 3, 2),
                date(2026, 4, 1)
            ]
        );
    }

    #[test]
    fn test_stop_before_start_is_empty() {
        for recurrence in [
            Recurrence::Once,
            Recurrence::Weekly,
            Recurrence::Monthly,
            Recurrence::Quarterly,
            Recurrence::Yearly,
            Recurrence::EveryDays(3),
        ] {
            let dates = generate(
                date(2026, 5, 1),
                recurrence,
                date(2027, 5, 1),
                Some(date(2026, 4, 30)),
            );
            assert!(dates.is_empty(), "{recurrence:?} should be empty");
        }
    }

    #[test]
    fn test_once_emits_start_only_when_in_bounds() {
        let start = date(2026, 3, 10);
        assert_eq!(
            generate(start, Recurrence::Once, date(2027, 1, 1), None),
            vec![start]
        );
        assert_eq!(
            generate(start, Recurrence::Once, start, Some(start)),
            vec![start]
        );
        assert!(generate(start, Recurrence::Once, date(2026, 3, 9), None).is_empty());
    }

    #[test]
    fn test_start_after_horizon_is_empty() {
        assert!(generate(date(2028, 1, 1), Recurrence::Monthly, date(2027, 1, 1), None).is_empty());
    }

    #[test]
    fn test_consecutive_dates_differ_by_one_interval() {
        // Holds for days that exist in every month; month ends are covered below
        let start = date(2026, 1, 15);
        let horizon = date(2030, 1, 1);

        let weekly = generate(start, Recurrence::Weekly, horizon, None);
        for pair in weekly.windows(2) {
            assert_eq!(pair[0] + Days::new(7), pair[1]);
        }

        let monthly = generate(start, Recurrence::Monthly, horizon, None);
        for pair in monthly.windows(2) {
            assert_eq!(pair[0] + Months::new(1), pair[1]);
        }

        let quarterly = generate(start, Recurrence::Quarterly, horizon, None);
        for pair in quarterly.windows(2) {
            assert_eq!(pair[0] + Months::new(3), pair[1]);
        }

        let yearly = generate(start, Recurrence::Yearly, horizon, None);
        assert_eq!(
            yearly,
            vec![
                date(2026, 1, 15),
                date(2027, 1, 15),
                date(2028, 1, 15),
                date(2029, 1, 15)
            ]
        );
    }

    #[test]
    fn test_monthly_restores_day_after_short_month() {
        let dates = generate(
            date(2026, 1, 31),
            Recurrence::Monthly,
            date(2026, 5, 31),
            None,
        );
        assert_eq!(
            dates,
            vec![
                date(2026, 1, 31),
                date(2026, 2, 28),
                date(2026, 3, 31),
                date(2026, 4, 30),
                date(2026, 5, 31)
            ]
        );
    }

    #[test]
    fn test_month_end_steps_count_from_start_not_previous_date() {
        // After a clamped date the next one is start + n months, not previous + 1 month
        let monthly = generate(date(2026, 1, 31), Recurrence::Monthly, date(2026, 3, 31), None);
        assert_eq!(monthly[1], date(2026, 2, 28));
        assert_ne!(monthly[1] + Months::new(1), monthly[2]);
        assert_eq!(monthly[2], date(2026, 3, 31));
        for (n, due) in monthly.iter().enumerate() {
            assert_eq!(date(2026, 1, 31) + Months::new(u32::try_from(n).unwrap()), *due);
        }

        let quarterly = generate(
            date(2025, 11, 30),
            Recurrence::Quarterly,
            date(2026, 12, 31),
            None,
        );
        assert_eq!(
            quarterly,
            vec![
                date(2025, 11, 30),
                date(2026, 2, 28),
                date(2026, 5, 30),
                date(2026, 8, 30),
                date(2026, 11, 30)
            ]
        );
    }

    #[test]
    fn test_leap_day_yearly() {
        let dates = generate(
            date(2024, 2, 29),
            Recurrence::Yearly,
            date(2028, 12, 31),
            None,
        );
        assert_eq!(
            dates,
            vec![
                date(2024, 2, 29),
                date(2025, 2, 28),
                date(2026, 2, 28),
                date(2027, 2, 28),
                date(2028, 2, 29)
            ]
        );
    }

    #[test]
    fn test_stop_date_is_inclusive() {
        let dates = generate(
            date(2026, 1, 1),
            Recurrence::Weekly,
            date(2027, 1, 1),
            Some(date(2026, 1, 15)),
        );
        assert_eq!(
            dates,
            vec![date(2026, 1, 1), date(2026, 1, 8), date(2026, 1, 15)]
        );
    }

    #[test]
    fn test_length_is_bounded() {
        let start = date(2026, 1, 1);
        let horizon = date(2027, 1, 1);
        let dates = generate(start, Recurrence::EveryDays(10), horizon, None);
        let span = (horizon - start).num_days();
        assert_eq!(dates.len() as i64, span / 10 + 1);
        assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_far_horizon_terminates() {
        let dates = generate(date(2026, 1, 1), Recurrence::Yearly, NaiveDate::MAX, None);
        assert!(!dates.is_empty());
        assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_recurrence_validation() {
        assert!(matches!(
            Recurrence::new(RecurrenceType::Custom, None),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            Recurrence::new(RecurrenceType::Custom, Some(0)),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            Recurrence::new(RecurrenceType::Custom, Some(-5)),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            Recurrence::new(RecurrenceType::Monthly, Some(30)),
            Err(Error::Config { .. })
        ));
        assert_eq!(
            Recurrence::new(RecurrenceType::Custom, Some(14)).unwrap(),
            Recurrence::EveryDays(14)
        );
        assert_eq!(
            Recurrence::new(RecurrenceType::None, None).unwrap(),
            Recurrence::Once
        );
    }

    #[test]
    fn test_recurrence_round_trips_through_storage_columns() {
        let rule = Recurrence::EveryDays(45);
        let restored =
            Recurrence::from_stored(rule.kind().as_str(), rule.custom_interval_days()).unwrap();
        assert_eq!(restored, rule);

        assert_eq!(
            Recurrence::from_stored("Quarterly", None).unwrap(),
            Recurrence::Quarterly
        );
        assert!(Recurrence::from_stored("fortnightly", None).is_err());
    }

    #[test]
    fn test_calendar_day_strips_time() {
        let utc = Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).unwrap();
        assert_eq!(calendar_day(&utc), date(2026, 3, 1));

        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2026, 3, 2, 0, 30, 0).unwrap();
        assert_eq!(calendar_day(&local), date(2026, 3, 2));
    }
}
