//! SQLite backend for the retail warehouse.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The schema (tables, indexes and both
//! reporting views) is applied on open.

mod encode;
mod refresh;
mod scd;
mod schema;
mod store;

pub mod error;

pub use error::{ConstraintKind, Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
