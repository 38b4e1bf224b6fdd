//! Comparison periods and their resolution into date windows

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::filter::DateRange;
use super::result::{Error, Result};

/// Granularity of a period-over-period comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonPeriod {
    Daily,
    Weekly,
    Monthly,
}

/// Current and prior windows for one comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodWindows {
    pub current: DateRange,
    pub prior: DateRange,
}

impl ComparisonPeriod {
    pub fn label(&self) -> &'static str {
        match self {
            ComparisonPeriod::Daily => "Today vs Yesterday",
            ComparisonPeriod::Weekly => "This Week vs Last Week",
            ComparisonPeriod::Monthly => "This Month vs Last Month",
        }
    }

    /// Resolve `anchor` into to-date windows.
    ///
    /// Weeks start on Monday. The prior window covers the same number of
    /// days from the start of the previous period, capped at that period's
    /// end, so a comparison made on the 31st does not spill into the current
    /// month.
    pub fn resolve(&self, anchor: NaiveDate) -> Result<PeriodWindows> {
        let end = next_day(anchor)?;
        match self {
            ComparisonPeriod::Daily => Ok(PeriodWindows {
                current: DateRange::new(anchor, end),
                prior: DateRange::new(prev_day(anchor)?, anchor),
            }),
            ComparisonPeriod::Weekly => {
                let start = anchor - Duration::days(anchor.weekday().num_days_from_monday() as i64);
                let week = Duration::days(7);
                Ok(PeriodWindows {
                    current: DateRange::new(start, end),
                    prior: DateRange::new(start - week, end - week),
                })
            }
            ComparisonPeriod::Monthly => {
                let start = first_of_month(anchor.year(), anchor.month())?;
                let (py, pm) = if anchor.month() == 1 {
                    (anchor.year() - 1, 12)
                } else {
                    (anchor.year(), anchor.month() - 1)
                };
                let prior_start = first_of_month(py, pm)?;
                let elapsed = end - start;
                let prior_end = (prior_start + elapsed).min(start);
                Ok(PeriodWindows {
                    current: DateRange::new(start, end),
                    prior: DateRange::new(prior_start, prior_end),
                })
            }
        }
    }
}

impl fmt::Display for ComparisonPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComparisonPeriod::Daily => "daily",
            ComparisonPeriod::Weekly => "weekly",
            ComparisonPeriod::Monthly => "monthly",
        };
        f.write_str(name)
    }
}

impl FromStr for ComparisonPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" => Ok(ComparisonPeriod::Daily),
            "weekly" | "week" => Ok(ComparisonPeriod::Weekly),
            "monthly" | "month" => Ok(ComparisonPeriod::Monthly),
            other => Err(Error::validation(format!(
                "Unknown period '{}' (expected daily, weekly or monthly)",
                other
            ))),
        }
    }
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::validation(format!("Invalid month {}-{}", year, month)))
}

fn next_day(date: NaiveDate) -> Result<NaiveDate> {
    date.succ_opt()
        .ok_or_else(|| Error::validation(format!("Date out of range: {}", date)))
}

fn prev_day(date: NaiveDate) -> Result<NaiveDate> {
    date.pred_opt()
        .ok_or_else(|| Error::validation(format!("Date out of range: {}", date)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_windows() {
        let w = ComparisonPeriod::Daily.resolve(ymd(2025, 5, 17)).unwrap();
        assert_eq!(w.current, DateRange::new(ymd(2025, 5, 17), ymd(2025, 5, 18)));
        assert_eq!(w.prior, DateRange::new(ymd(2025, 5, 16), ymd(2025, 5, 17)));
    }

    #[test]
    fn test_weekly_windows_are_week_to_date() {
        // 2025-05-17 is a Saturday
        let w = ComparisonPeriod::Weekly.resolve(ymd(2025, 5, 17)).unwrap();
        assert_eq!(w.current, DateRange::new(ymd(2025, 5, 12), ymd(2025, 5, 18)));
        assert_eq!(w.prior, DateRange::new(ymd(2025, 5, 5), ymd(2025, 5, 11)));
    }

    #[test]
    fn test_monthly_windows_are_month_to_date() {
        let w = ComparisonPeriod::Monthly.resolve(ymd(2025, 5, 17)).unwrap();
        assert_eq!(w.current, DateRange::new(ymd(2025, 5, 1), ymd(2025, 5, 18)));
        assert_eq!(w.prior, DateRange::new(ymd(2025, 4, 1), ymd(2025, 4, 18)));
    }

    #[test]
    fn test_monthly_prior_is_capped_at_month_end() {
        let w = ComparisonPeriod::Monthly.resolve(ymd(2025, 3, 31)).unwrap();
        assert_eq!(w.prior, DateRange::new(ymd(2025, 2, 1), ymd(2025, 3, 1)));

        let jan = ComparisonPeriod::Monthly.resolve(ymd(2025, 1, 10)).unwrap();
        assert_eq!(jan.prior, DateRange::new(ymd(2024, 12, 1), ymd(2024, 12, 11)));
    }

    #[test]
    fn test_labels_and_parsing() {
        assert_eq!(ComparisonPeriod::Daily.label(), "Today vs Yesterday");
        assert_eq!(ComparisonPeriod::Weekly.label(), "This Week vs Last Week");
        assert_eq!(ComparisonPeriod::Monthly.label(), "This Month vs Last Month");
        assert_eq!("Weekly".parse::<ComparisonPeriod>().unwrap(), ComparisonPeriod::Weekly);
        assert!("hourly".parse::<ComparisonPeriod>().is_err());
    }
}
