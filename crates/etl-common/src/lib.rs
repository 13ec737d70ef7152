//! ETL Common Library
//!
//! Shared types, logging, and error handling for the ETL pipeline.
//!
//! # Overview
//!
//! This crate provides common functionality used across the workspace:
//!
//! - **Error Handling**: [`EtlError`] and the [`Result`] alias returned by every
//!   collaborator boundary (sinks, producers, database sinks)
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Types**: the [`Record`] payload flowing from producers into batches
//!
//! # Example
//!
//! ```no_run
//! use etl_common::{EtlError, Record, Result};
//!
//! fn parse_record(raw: &str) -> Result<Record> {
//!     let record: Record = serde_json::from_str(raw)?;
//!     if record.is_empty() {
//!         return Err(EtlError::Decode("empty record".to_string()));
//!     }
//!     Ok(record)
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{EtlError, Result};
pub use types::Record;
