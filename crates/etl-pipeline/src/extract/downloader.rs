//! HTTP producer streaming a JSON array of records

use async_trait::async_trait;
use etl_common::{EtlError, Result};
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tracing::{debug, info, instrument};

use super::codec::JsonArrayDecoder;
use super::producer::{Producer, RecordSender};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlDownloaderConfig {
    /// Endpoint returning a JSON array of objects
    pub url: String,

    /// Whole-request timeout; unbounded when absent
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl UrlDownloaderConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: None,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url.trim().is_empty() {
            anyhow::bail!("downloader url cannot be empty");
        }
        Ok(())
    }
}

/// Fetches one URL and streams every array element as a record
pub struct UrlDownloader {
    client: reqwest::Client,
    config: UrlDownloaderConfig,
}

impl UrlDownloader {
    pub fn new(config: UrlDownloaderConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| EtlError::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Producer for UrlDownloader {
    #[instrument(skip(self, output), fields(url = %self.config.url))]
    async fn download(&self, output: RecordSender) -> Result<()> {
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| EtlError::network(format!("failed to fetch data: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::network(format!("failed to fetch data: status {}", status)));
        }

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let mut records = FramedRead::new(StreamReader::new(body), JsonArrayDecoder::new());

        let mut count = 0usize;
        while let Some(record) = records.next().await {
            output.send(record?).await?;
            count += 1;
            debug!(count, "Forwarded record");
        }

        info!(count, "Finished downloading");
        Ok(())
    }
}
