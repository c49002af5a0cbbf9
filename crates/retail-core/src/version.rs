//! Slowly-changing-dimension (Type 2) version bookkeeping.
//!
//! A versioned dimension keeps one row per version of a business entity. Each
//! row carries a half-open validity window `[effective_date,
//! expiration_date)`; the single row whose window is still open is the
//! current version. Superseding a version closes its window at the new
//! version's effective date and opens the new one, in one transaction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Validity window ─────────────────────────────────────────────────────────

/// The SCD columns shared by `dim_customer` and `dim_product`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validity {
  pub effective_date:  NaiveDate,
  /// `None` while the window is open.
  pub expiration_date: Option<NaiveDate>,
  pub is_current:      bool,
}

impl Validity {
  /// An open window starting at `effective_date`.
  pub fn open(effective_date: NaiveDate) -> Self {
    Self { effective_date, expiration_date: None, is_current: true }
  }

  /// Whether this version applied on `date`.
  pub fn covers(&self, date: NaiveDate) -> bool {
    self.effective_date <= date && self.expiration_date.is_none_or(|end| date < end)
  }

  pub fn status(&self) -> VersionStatus {
    match (self.is_current, self.expiration_date) {
      (false, Some(on)) => VersionStatus::Expired { on },
      _ => VersionStatus::Current,
    }
  }
}

// ─── Computed status ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VersionStatus {
  Current,
  Expired { on: NaiveDate },
}

impl VersionStatus {
  pub fn is_current(&self) -> bool { matches!(self, Self::Current) }
}

// ─── Transition result ───────────────────────────────────────────────────────

/// Both sides of a supersede transition: the version that was closed and the
/// version that replaced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supersession<T> {
  pub expired: T,
  pub current: T,
}

impl<T> Supersession<T> {
  /// Convert both sides, failing if either conversion fails.
  pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> Result<U, E>) -> Result<Supersession<U>, E> {
    Ok(Supersession { expired: f(self.expired)?, current: f(self.current)? })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn open_window_covers_everything_after_start() {
    let v = Validity::open(ymd(2024, 1, 1));
    assert!(!v.covers(ymd(2023, 12, 31)));
    assert!(v.covers(ymd(2024, 1, 1)));
    assert!(v.covers(ymd(2100, 6, 1)));
    assert!(v.status().is_current());
  }

  #[test]
  fn closed_window_excludes_expiration_day() {
    let v = Validity {
      effective_date:  ymd(2024, 1, 1),
      expiration_date: Some(ymd(2024, 6, 1)),
      is_current:      false,
    };
    assert!(v.covers(ymd(2024, 5, 31)));
    assert!(!v.covers(ymd(2024, 6, 1)));
    assert_eq!(v.status(), VersionStatus::Expired { on: ymd(2024, 6, 1) });
  }
}
