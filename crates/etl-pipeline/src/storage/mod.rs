//! Durable named-blob storage
//!
//! The [`Sink`] trait is the only storage type the pipeline core depends on.
//! Two adapters implement it: [`FileSystemSink`] for a local directory and
//! [`S3Sink`] for an S3-compatible bucket.

use async_trait::async_trait;
use etl_common::Result;
use std::sync::Arc;
use tracing::info;

pub mod config;
pub mod filesystem;
pub mod s3;

pub use config::{S3Config, StorageConfig};
pub use filesystem::FileSystemSink;
pub use s3::S3Sink;

/// Flat namespace of named byte blobs
///
/// `write` creates or overwrites. `list` order is unspecified.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn write(&self, data: Vec<u8>, name: &str) -> Result<()>;

    async fn read(&self, name: &str) -> Result<Vec<u8>>;

    async fn list(&self) -> Result<Vec<String>>;

    async fn delete(&self, name: &str) -> Result<()>;
}

/// Build the sink selected by configuration
pub async fn from_config(config: &StorageConfig) -> Result<Arc<dyn Sink>> {
    match config {
        StorageConfig::FileSystem { root } => {
            info!(root = %root.display(), "Using filesystem sink");
            Ok(Arc::new(FileSystemSink::new(root)))
        },
        StorageConfig::S3(s3) => {
            info!(bucket = %s3.bucket, "Using S3 sink");
            Ok(Arc::new(S3Sink::new(s3.clone()).await?))
        },
    }
}
