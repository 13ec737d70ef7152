//! Extract stage
//!
//! A [`Producer`] streams [`Record`](etl_common::Record)s through a rendezvous
//! handoff into the [`Dumper`], which batches them and persists each batch to a
//! [`Sink`](crate::storage::Sink) as a JSON array named by its flush time.

pub mod codec;
pub mod config;
pub mod downloader;
pub mod dumper;
pub mod producer;

pub use config::{DumpConfig, ExtractConfig};
pub use downloader::{UrlDownloader, UrlDownloaderConfig};
pub use dumper::{DumpError, Dumper};
pub use producer::{Producer, RecordSender};
