//! Extract stage configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::downloader::UrlDownloaderConfig;

/// One mebibyte, the unit size limits are usually written in
pub const MB: u64 = 1024 * 1024;

/// Default time window between forced flushes.
pub const DEFAULT_TIME_LIMIT_MS: u64 = 60_000;

/// Default batch size threshold.
pub const DEFAULT_SIZE_LIMIT_BYTES: u64 = 5 * MB;

/// Flush triggers for the [`Dumper`](super::Dumper)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpConfig {
    /// Milliseconds between timer-driven flushes
    #[serde(default = "default_time_limit_ms")]
    pub time_limit_ms: u64,

    /// Cumulative serialized bytes of the current batch that force a flush.
    /// Zero flushes on every arrival.
    #[serde(default = "default_size_limit_bytes")]
    pub size_limit_bytes: u64,
}

fn default_time_limit_ms() -> u64 {
    DEFAULT_TIME_LIMIT_MS
}

fn default_size_limit_bytes() -> u64 {
    DEFAULT_SIZE_LIMIT_BYTES
}

impl DumpConfig {
    pub fn new(time_limit_ms: u64, size_limit_bytes: u64) -> Self {
        Self {
            time_limit_ms,
            size_limit_bytes,
        }
    }

    /// Flush window; never zero so the ticker stays well defined
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms.max(1))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.time_limit_ms == 0 {
            anyhow::bail!("dumper time_limit_ms must be greater than 0");
        }
        Ok(())
    }
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_LIMIT_MS, DEFAULT_SIZE_LIMIT_BYTES)
    }
}

/// Everything the `extract` command needs besides storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default)]
    pub dumper: DumpConfig,
    pub downloader: UrlDownloaderConfig,
}

impl ExtractConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.dumper.validate()?;
        self.downloader.validate()
    }
}
