//! Error type for `retail-store-sqlite`.

use std::fmt;

use chrono::NaiveDate;
use retail_core::{Classify, ErrorClass};
use rusqlite::{ErrorCode, ffi};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] retail_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  /// The engine rejected a write. No recovery is attempted.
  #[error("{kind} constraint violated: {message}")]
  Constraint { kind: ConstraintKind, message: String },

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored value no longer maps onto a domain type.
  #[error("decode error: {0}")]
  Decode(String),

  #[error("{dimension} {business_id:?} already has a current version")]
  AlreadyCurrent { dimension: &'static str, business_id: String },

  #[error("{dimension} {business_id:?} has no current version")]
  NoCurrentVersion { dimension: &'static str, business_id: String },

  /// `new` would overlap an existing validity window that reaches `current`.
  #[error("effective date {new} overlaps an existing version (boundary {current})")]
  InvalidEffectiveDate { current: NaiveDate, new: NaiveDate },

  #[error("{dimension} {business_id:?}: the current version cannot be deleted while older versions exist")]
  CurrentVersionHasHistory { dimension: &'static str, business_id: String },

  #[error("store not found: {0}")]
  StoreNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Constraint classification ───────────────────────────────────────────────

/// Which kind of declared constraint the engine enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
  ForeignKey,
  Unique,
  PrimaryKey,
  NotNull,
  Check,
  Other,
}

impl ConstraintKind {
  fn from_extended_code(code: i32) -> Self {
    match code {
      ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::ForeignKey,
      ffi::SQLITE_CONSTRAINT_UNIQUE => Self::Unique,
      ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Self::PrimaryKey,
      ffi::SQLITE_CONSTRAINT_NOTNULL => Self::NotNull,
      ffi::SQLITE_CONSTRAINT_CHECK => Self::Check,
      _ => Self::Other,
    }
  }
}

impl fmt::Display for ConstraintKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::ForeignKey => "foreign key",
      Self::Unique => "unique",
      Self::PrimaryKey => "primary key",
      Self::NotNull => "not null",
      Self::Check => "check",
      Self::Other => "other",
    })
  }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    if let rusqlite::Error::SqliteFailure(ffi_err, msg) = &e
      && ffi_err.code == ErrorCode::ConstraintViolation
    {
      return Self::Constraint {
        kind:    ConstraintKind::from_extended_code(ffi_err.extended_code),
        message: msg.clone().unwrap_or_else(|| ffi_err.to_string()),
      };
    }
    Self::Database(tokio_rusqlite::Error::Rusqlite(e))
  }
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Rusqlite(inner) => Self::from(inner),
      other => Self::Database(other),
    }
  }
}

impl Error {
  /// The constraint kind, if the engine rejected the write.
  pub fn constraint(&self) -> Option<ConstraintKind> {
    match self {
      Self::Constraint { kind, .. } => Some(*kind),
      _ => None,
    }
  }
}

impl Classify for Error {
  fn class(&self) -> ErrorClass {
    match self {
      Self::Core(e) => e.class(),
      Self::Constraint { kind: ConstraintKind::NotNull | ConstraintKind::Check, .. } => ErrorClass::Invalid,
      Self::Constraint { .. } | Self::AlreadyCurrent { .. } | Self::CurrentVersionHasHistory { .. } => {
        ErrorClass::Conflict
      }
      Self::NoCurrentVersion { .. } | Self::StoreNotFound(_) => ErrorClass::NotFound,
      Self::InvalidEffectiveDate { .. } => ErrorClass::Invalid,
      Self::Database(_) | Self::Uuid(_) | Self::DateParse(_) | Self::Decode(_) => ErrorClass::Internal,
    }
  }
}
