use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A calendar month. Budgets and monthly reports are keyed by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawYearMonth")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

/// Unchecked wire shape; deserialization goes through `YearMonth::new`.
#[derive(Deserialize)]
struct RawYearMonth {
    year: i32,
    month: u32,
}

impl TryFrom<RawYearMonth> for YearMonth {
    type Error = PeriodError;

    fn try_from(raw: RawYearMonth) -> Result<Self, Self::Error> {
        Self::new(raw.year, raw.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),
    #[error("year out of range: {0}")]
    InvalidYear(i32),
    #[error("expected YYYY-MM, got '{0}'")]
    InvalidFormat(String),
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::InvalidMonth(month));
        }
        // Keep well inside chrono's range so next()/bounds() never fail.
        if !(1..=9998).contains(&year) {
            return Err(PeriodError::InvalidYear(year));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The month containing the given instant (UTC).
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("YearMonth is validated")
    }

    /// Half-open UTC range `[start, end)` covering the whole month.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.first_day().and_time(chrono::NaiveTime::MIN).and_utc();
        let end = self.next().first_day().and_time(chrono::NaiveTime::MIN).and_utc();
        (start, end)
    }

    /// All twelve months of a year, January first.
    pub fn months_of(year: i32) -> Result<Vec<Self>, PeriodError> {
        (1..=12).map(|m| Self::new(year, m)).collect()
    }

    /// Human-readable label such as "March 2024".
    pub fn name(&self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PeriodError::InvalidFormat(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_rejects_invalid_month() {
        assert_eq!(YearMonth::new(2024, 0), Err(PeriodError::InvalidMonth(0)));
        assert_eq!(YearMonth::new(2024, 13), Err(PeriodError::InvalidMonth(13)));
    }

    #[test]
    fn test_deserialize_validates() {
        let month: YearMonth = serde_json::from_str(r#"{"year":2024,"month":3}"#).unwrap();
        assert_eq!(month, ym(2024, 3));
        assert_eq!(serde_json::to_string(&month).unwrap(), r#"{"year":2024,"month":3}"#);

        assert!(serde_json::from_str::<YearMonth>(r#"{"year":2024,"month":13}"#).is_err());
        assert!(serde_json::from_str::<YearMonth>(r#"{"year":0,"month":1}"#).is_err());
    }

    #[test]
    fn test_next_and_prev_wrap_year() {
        assert_eq!(ym(2024, 12).next(), ym(2025, 1));
        assert_eq!(ym(2024, 1).prev(), ym(2023, 12));
        assert_eq!(ym(2024, 6).next().prev(), ym(2024, 6));
    }

    #[test]
    fn test_bounds_are_half_open_month() {
        let (start, end) = ym(2024, 2).bounds();
        assert_eq!(start.format("%Y-%m-%d %H:%M").to_string(), "2024-02-01 00:00");
        assert_eq!(end.format("%Y-%m-%d %H:%M").to_string(), "2024-03-01 00:00");

        let (_, dec_end) = ym(2023, 12).bounds();
        assert_eq!(dec_end.format("%Y-%m-%d").to_string(), "2024-01-01");
    }

    #[test]
    fn test_parse_and_display() {
        let month: YearMonth = "2024-03".parse().unwrap();
        assert_eq!(month, ym(2024, 3));
        assert_eq!(month.to_string(), "2024-03");
        assert_eq!(month.name(), "March 2024");

        assert!("2024".parse::<YearMonth>().is_err());
        assert!("2024-xx".parse::<YearMonth>().is_err());
        assert_eq!("2024-13".parse::<YearMonth>(), Err(PeriodError::InvalidMonth(13)));
    }

    #[test]
    fn test_containing() {
        let at = DateTime::parse_from_rfc3339("2024-07-31T23:59:59Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(YearMonth::containing(at), ym(2024, 7));
    }

    #[test]
    fn test_months_of_year() {
        let months = YearMonth::months_of(2024).unwrap();
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], ym(2024, 1));
        assert_eq!(months[11], ym(2024, 12));
    }
}
