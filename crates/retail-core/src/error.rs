//! Error types for `retail-core`.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid date range: {start} is after {end}")]
  InvalidRange { start: NaiveDate, end: NaiveDate },

  #[error("fiscal year start month must be 1..=12, got {0}")]
  InvalidFiscalMonth(u32),

  #[error("invalid year-month {0:?}, expected YYYY-MM")]
  InvalidYearMonth(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// Coarse category of a backend error, independent of the backend.
///
/// Transport layers map this to their own status vocabulary (HTTP status
/// codes, process exit codes) without knowing the concrete error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  /// The addressed row or business key does not exist.
  NotFound,
  /// The write collides with existing state (constraint, SCD state).
  Conflict,
  /// The input is malformed or out of range.
  Invalid,
  Internal,
}

/// Implemented by every [`crate::store::WarehouseStore::Error`].
pub trait Classify {
  fn class(&self) -> ErrorClass;
}

impl Classify for Error {
  fn class(&self) -> ErrorClass { ErrorClass::Invalid }
}
