//! Core types and trait definitions for the retail star-schema warehouse.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

pub mod aggregate;
pub mod calendar;
pub mod dimension;
pub mod error;
pub mod fact;
pub mod report;
pub mod store;
pub mod version;

pub use error::{Classify, Error, ErrorClass, Result};
