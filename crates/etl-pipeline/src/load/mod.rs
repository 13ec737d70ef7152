//! Load stage
//!
//! The [`Processor`] lists artifacts from a [`Sink`](crate::storage::Sink),
//! resolves each one's target table with the [`TableMapper`], and hands the
//! pair to a [`DbSink`]. [`PostgresSink`] is the database sink used in
//! production.

pub mod config;
pub mod postgres;
pub mod processor;
pub mod table_mapper;

pub use config::{DatabaseConfig, LoadConfig};
pub use postgres::PostgresSink;
pub use processor::{DbSink, ProcessError, Processor};
pub use table_mapper::{TableConfig, TableMapError, TableMapper};
