//! S3-compatible bucket sink

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};
use etl_common::{EtlError, Result};
use tracing::{debug, info, instrument};

use super::{config::S3Config, Sink};

/// Stores each artifact as one object, keyed by name under an optional prefix
#[derive(Clone)]
pub struct S3Sink {
    client: Client,
    config: S3Config,
}

impl S3Sink {
    pub async fn new(config: S3Config) -> Result<Self> {
        debug!(bucket = %config.bucket, region = %config.region, "Initializing S3 sink");

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared).force_path_style(config.path_style);

        match (&config.access_key, &config.secret_key) {
            (Some(key), Some(secret)) => {
                builder = builder.credentials_provider(Credentials::new(
                    key,
                    secret,
                    None,
                    None,
                    "etl-static",
                ));
            },
            (None, None) => {},
            _ => {
                return Err(EtlError::Config(
                    "S3 access_key and secret_key must be set together".to_string(),
                ))
            },
        }

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());

        info!(bucket = %config.bucket, "S3 sink initialized");

        Ok(Self { client, config })
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }
}

#[async_trait]
impl Sink for S3Sink {
    #[instrument(skip(self, data), fields(bucket = %self.config.bucket, bytes = data.len()))]
    async fn write(&self, data: Vec<u8>, name: &str) -> Result<()> {
        let key = self.config.key_for(name);

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type("application/json")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                EtlError::storage(format!("failed to upload {}: {}", key, DisplayErrorContext(&e)))
            })?;

        debug!(key = %key, "Uploaded artifact");
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let key = self.config.key_for(name);

        let response = self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                EtlError::storage(format!("failed to download {}: {}", key, DisplayErrorContext(&e)))
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| EtlError::storage(format!("failed to read body of {}: {}", key, e)))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.config.bucket)
                .set_prefix(self.config.prefix.clone())
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| {
                    EtlError::storage(format!("failed to list objects: {}", DisplayErrorContext(&e)))
                })?;

            names.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key())
                    .filter_map(|key| self.config.name_for(key))
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            );

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                },
                _ => break,
            }
        }

        debug!(count = names.len(), "Listed artifacts");
        Ok(names)
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn delete(&self, name: &str) -> Result<()> {
        let key = self.config.key_for(name);

        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                EtlError::storage(format!("failed to delete {}: {}", key, DisplayErrorContext(&e)))
            })?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_half_configured_credentials() {
        let mut config = S3Config::for_minio("http://localhost:9000", "raw-data");
        config.secret_key = None;

        let result = S3Sink::new(config).await;
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[tokio::test]
    async fn test_builds_client_for_minio() {
        let sink = S3Sink::new(S3Config::for_minio("http://localhost:9000", "raw-data"))
            .await
            .unwrap();
        assert_eq!(sink.bucket(), "raw-data");
    }
}
