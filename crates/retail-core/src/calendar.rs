//! The date dimension and the derivation of its calendar attributes.
//!
//! Rows of `dim_date` are pure functions of the date and the fiscal calendar,
//! so the warehouse derives them instead of accepting hand-filled rows.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Fiscal calendar ─────────────────────────────────────────────────────────

/// A fiscal year that starts on the first day of `start_month`.
///
/// Fiscal years are named after the calendar year in which they end, so with
/// a July start, 2024-07-01 falls in fiscal year 2025.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalCalendar {
  start_month: u32,
}

impl FiscalCalendar {
  pub fn new(start_month: u32) -> Result<Self> {
    if !(1..=12).contains(&start_month) {
      return Err(Error::InvalidFiscalMonth(start_month));
    }
    Ok(Self { start_month })
  }

  pub fn start_month(&self) -> u32 { self.start_month }

  pub fn fiscal_year(&self, date: NaiveDate) -> i32 {
    if self.start_month == 1 || date.month() < self.start_month {
      date.year()
    } else {
      date.year() + 1
    }
  }

  pub fn fiscal_quarter(&self, date: NaiveDate) -> u32 {
    (date.month() + 12 - self.start_month) % 12 / 3 + 1
  }
}

impl Default for FiscalCalendar {
  fn default() -> Self { Self { start_month: 1 } }
}

// ─── DateDim ─────────────────────────────────────────────────────────────────

/// One calendar day in `dim_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateDim {
  /// Surrogate key; `YYYYMMDD` when derived with [`DateDim::for_date`].
  pub date_key:       i64,
  pub date_value:     NaiveDate,
  /// ISO numbering: 1 is Monday, 7 is Sunday.
  pub day_of_week:    u32,
  pub day_name:       String,
  pub day_of_month:   u32,
  pub day_of_year:    u32,
  /// ISO 8601 week number.
  pub week_of_year:   u32,
  pub month:          u32,
  pub month_name:     String,
  pub quarter:        u32,
  pub year:           i32,
  pub is_weekend:     bool,
  pub is_holiday:     bool,
  pub fiscal_year:    i32,
  pub fiscal_quarter: u32,
}

impl DateDim {
  /// Derive every attribute of `date`. `is_holiday` starts out `false`;
  /// holiday calendars are the loader's concern.
  pub fn for_date(date: NaiveDate, fiscal: &FiscalCalendar) -> Self {
    let weekday = date.weekday();
    Self {
      date_key:       date_key(date),
      date_value:     date,
      day_of_week:    weekday.number_from_monday(),
      day_name:       date.format("%A").to_string(),
      day_of_month:   date.day(),
      day_of_year:    date.ordinal(),
      week_of_year:   date.iso_week().week(),
      month:          date.month(),
      month_name:     date.format("%B").to_string(),
      quarter:        (date.month() - 1) / 3 + 1,
      year:           date.year(),
      is_weekend:     matches!(weekday, Weekday::Sat | Weekday::Sun),
      is_holiday:     false,
      fiscal_year:    fiscal.fiscal_year(date),
      fiscal_quarter: fiscal.fiscal_quarter(date),
    }
  }
}

/// The conventional `YYYYMMDD` surrogate key for `date`.
pub fn date_key(date: NaiveDate) -> i64 {
  i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

/// Every day in `start..=end`.
pub fn days(start: NaiveDate, end: NaiveDate) -> Result<impl Iterator<Item = NaiveDate>> {
  if end < start {
    return Err(Error::InvalidRange { start, end });
  }
  Ok(start.iter_days().take_while(move |d| *d <= end))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn derives_calendar_attributes() {
    let row = DateDim::for_date(ymd(2024, 3, 15), &FiscalCalendar::default());

    assert_eq!(row.date_key, 20240315);
    assert_eq!(row.day_of_week, 5);
    assert_eq!(row.day_name, "Friday");
    assert_eq!(row.day_of_year, 75);
    assert_eq!(row.month_name, "March");
    assert_eq!(row.quarter, 1);
    assert!(!row.is_weekend);
    assert!(!row.is_holiday);
    assert_eq!(row.fiscal_year, 2024);
    assert_eq!(row.fiscal_quarter, 1);
  }

  #[test]
  fn weekend_detection() {
    let fiscal = FiscalCalendar::default();
    assert!(DateDim::for_date(ymd(2024, 3, 16), &fiscal).is_weekend);
    assert!(DateDim::for_date(ymd(2024, 3, 17), &fiscal).is_weekend);
    assert!(!DateDim::for_date(ymd(2024, 3, 18), &fiscal).is_weekend);
  }

  #[test]
  fn iso_week_crosses_year_boundary() {
    let row = DateDim::for_date(ymd(2023, 1, 1), &FiscalCalendar::default());
    assert_eq!(row.week_of_year, 52);
    assert_eq!(row.year, 2023);
  }

  #[test]
  fn fiscal_year_named_by_ending_year() {
    let fiscal = FiscalCalendar::new(7).unwrap();

    let july = DateDim::for_date(ymd(2024, 7, 1), &fiscal);
    assert_eq!(july.fiscal_year, 2025);
    assert_eq!(july.fiscal_quarter, 1);

    let june = DateDim::for_date(ymd(2024, 6, 30), &fiscal);
    assert_eq!(june.fiscal_year, 2024);
    assert_eq!(june.fiscal_quarter, 4);

    let jan = DateDim::for_date(ymd(2025, 1, 10), &fiscal);
    assert_eq!(jan.fiscal_year, 2025);
    assert_eq!(jan.fiscal_quarter, 3);
  }

  #[test]
  fn fiscal_month_out_of_range_is_rejected() {
    assert!(matches!(FiscalCalendar::new(0), Err(Error::InvalidFiscalMonth(0))));
    assert!(matches!(FiscalCalendar::new(13), Err(Error::InvalidFiscalMonth(13))));
  }

  #[test]
  fn days_is_inclusive() {
    let all: Vec<_> = days(ymd(2024, 2, 27), ymd(2024, 3, 1)).unwrap().collect();
    assert_eq!(all.len(), 4);
    assert_eq!(all[2], ymd(2024, 2, 29));
  }

  #[test]
  fn days_rejects_reversed_range() {
    assert!(days(ymd(2024, 3, 2), ymd(2024, 3, 1)).is_err());
  }
}
