//! Precomputed rollups over `fact_sales` and the policy that refreshes them.
//!
//! Aggregate tables are a derived cache. Nothing keeps them in step with the
//! facts automatically; they are exactly as fresh as the last
//! [`RefreshPolicy`] run that covered a given day or month.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── YearMonth ───────────────────────────────────────────────────────────────

/// A calendar month, rendered as `YYYY-MM` in `agg_monthly_product`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
  pub year:  i32,
  pub month: u32,
}

impl YearMonth {
  pub fn of(date: NaiveDate) -> Self {
    Self { year: date.year(), month: date.month() }
  }
}

impl fmt::Display for YearMonth {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:04}-{:02}", self.year, self.month)
  }
}

impl FromStr for YearMonth {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidYearMonth(s.to_owned());
    let (y, m) = s.split_once('-').ok_or_else(invalid)?;
    if y.len() != 4 || m.len() != 2 {
      return Err(invalid());
    }
    let year: i32 = y.parse().map_err(|_| invalid())?;
    let month: u32 = m.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
      return Err(invalid());
    }
    Ok(Self { year, month })
  }
}

impl TryFrom<String> for YearMonth {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { s.parse() }
}

impl From<YearMonth> for String {
  fn from(ym: YearMonth) -> Self { ym.to_string() }
}

// ─── Aggregate rows ──────────────────────────────────────────────────────────

/// One row of `agg_daily_sales`: a store's sales on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySales {
  pub date_key:              i64,
  pub store_key:             i64,
  /// Distinct `transaction_id`s, not sales lines.
  pub total_transactions:    i64,
  pub total_quantity:        i64,
  pub total_revenue:         f64,
  pub total_cost:            f64,
  pub total_profit:          f64,
  pub avg_transaction_value: f64,
}

/// One row of `agg_monthly_product`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProduct {
  pub year_month:     YearMonth,
  pub product_key:    i64,
  pub total_quantity: i64,
  pub total_revenue:  f64,
  pub total_cost:     f64,
  pub total_profit:   f64,
  /// Profit as a percentage of revenue, 2 dp; 0 when revenue is 0.
  pub profit_margin:  f64,
}

/// Parameters for [`crate::store::WarehouseStore::daily_sales`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailySalesQuery {
  pub from:      Option<NaiveDate>,
  pub to:        Option<NaiveDate>,
  pub store_key: Option<i64>,
}

// ─── Refresh policy ──────────────────────────────────────────────────────────

/// How a refresh decides which aggregate rows to rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RefreshPolicy {
  /// Drop both aggregate tables and rebuild them from every fact.
  Full,
  /// Rebuild daily rows for days in `from..=to` and monthly rows for every
  /// month that range touches. Rows outside the range are left alone.
  Incremental { from: NaiveDate, to: NaiveDate },
}

impl RefreshPolicy {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Full => "full",
      Self::Incremental { .. } => "incremental",
    }
  }

  /// Reject reversed incremental ranges.
  pub fn validate(&self) -> Result<()> {
    match *self {
      Self::Incremental { from, to } if to < from => Err(Error::InvalidRange { start: from, end: to }),
      _ => Ok(()),
    }
  }
}

/// The outcome of one refresh, also persisted in `agg_refresh_log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshReport {
  pub refresh_id:   Uuid,
  pub policy:       RefreshPolicy,
  pub daily_rows:   usize,
  pub monthly_rows: usize,
  pub started_at:   DateTime<Utc>,
  pub finished_at:  DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn year_month_parses_and_displays() {
    let ym: YearMonth = "2024-03".parse().unwrap();
    assert_eq!(ym, YearMonth { year: 2024, month: 3 });
    assert_eq!(ym.to_string(), "2024-03");
  }

  #[test]
  fn year_month_rejects_garbage() {
    for bad in ["2024-13", "2024-3", "24-03", "2024/03", "abcd-ef", ""] {
      assert!(bad.parse::<YearMonth>().is_err(), "{bad:?} should not parse");
    }
  }

  #[test]
  fn year_month_serde_is_a_string() {
    let ym = YearMonth { year: 2023, month: 11 };
    assert_eq!(serde_json::to_string(&ym).unwrap(), "\"2023-11\"");
    let back: YearMonth = serde_json::from_str("\"2023-11\"").unwrap();
    assert_eq!(back, ym);
  }

  #[test]
  fn incremental_range_must_be_ordered() {
    let from = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    assert!(RefreshPolicy::Incremental { from, to }.validate().is_err());
    assert!(RefreshPolicy::Incremental { from: to, to: from }.validate().is_ok());
    assert!(RefreshPolicy::Full.validate().is_ok());
  }
}
