//! ETL Pipeline Library
//!
//! Two-stage batch pipeline moving JSON records from a remote source into a
//! database through durable named artifacts.
//!
//! # Overview
//!
//! - **Extract**: a [`extract::Producer`] streams records into the
//!   [`extract::Dumper`], which buffers them and flushes batches to a
//!   [`storage::Sink`] whenever a time window elapses or a size threshold is
//!   crossed.
//! - **Load**: the [`load::Processor`] lists artifacts from a sink, routes each
//!   one to a target table with the [`load::TableMapper`], and hands the pair to
//!   a [`load::DbSink`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use etl_pipeline::extract::{DumpConfig, Dumper, UrlDownloader, UrlDownloaderConfig};
//! use etl_pipeline::storage::FileSystemSink;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let producer = UrlDownloader::new(UrlDownloaderConfig::new("http://localhost:8080/users"))?;
//!     let sink = FileSystemSink::new("./artifacts");
//!
//!     let dumper = Dumper::new(
//!         &CancellationToken::new(),
//!         DumpConfig::new(1_000, 1024 * 1024),
//!         Arc::new(producer),
//!         Arc::new(sink),
//!     );
//!     dumper.run().await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod extract;
pub mod load;
pub mod storage;

pub use config::PipelineConfig;
