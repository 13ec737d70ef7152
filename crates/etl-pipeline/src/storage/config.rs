use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default region, matching where the extract stage was first deployed
pub const DEFAULT_S3_REGION: &str = "eu-west-1";

/// Storage backend selection, tagged by `backend`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Artifacts are files directly under `root`
    FileSystem { root: PathBuf },
    /// Artifacts are objects in an S3-compatible bucket
    S3(S3Config),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint (MinIO, localstack); `None` uses AWS
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Static credentials; when absent the default AWS provider chain is used
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub path_style: bool,
    /// Key prefix artifacts live under, e.g. "raw/"
    #[serde(default)]
    pub prefix: Option<String>,
}

fn default_region() -> String {
    DEFAULT_S3_REGION.to_string()
}

impl S3Config {
    pub fn for_minio(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: "us-east-1".to_string(),
            endpoint: Some(endpoint.into()),
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            path_style: true,
            prefix: None,
        }
    }

    /// Full object key for an artifact name
    pub fn key_for(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, name),
            None => name.to_string(),
        }
    }

    /// Artifact name for an object key, if the key lives under the prefix
    pub fn name_for<'a>(&self, key: &'a str) -> Option<&'a str> {
        match &self.prefix {
            Some(prefix) => key.strip_prefix(prefix.as_str()),
            None => Some(key),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_for_minio() {
        let config = S3Config::for_minio("http://localhost:9000", "raw-data");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.bucket, "raw-data");
        assert!(config.path_style);
    }

    #[test]
    fn test_prefix_mapping() {
        let mut config = S3Config::for_minio("http://localhost:9000", "raw-data");
        assert_eq!(config.key_for("1700000000000"), "1700000000000");

        config.prefix = Some("extract/".to_string());
        assert_eq!(config.key_for("1700000000000"), "extract/1700000000000");
        assert_eq!(config.name_for("extract/1700000000000"), Some("1700000000000"));
        assert_eq!(config.name_for("other/1700000000000"), None);
    }

    #[test]
    fn test_backend_tag() {
        let config: StorageConfig =
            serde_json::from_str(r#"{"backend":"file_system","root":"/tmp/artifacts"}"#)
                .unwrap();
        assert_eq!(
            config,
            StorageConfig::FileSystem {
                root: PathBuf::from("/tmp/artifacts")
            }
        );

        let config: StorageConfig =
            serde_json::from_str(r#"{"backend":"s3","bucket":"raw-data"}"#).unwrap();
        match config {
            StorageConfig::S3(s3) => {
                assert_eq!(s3.region, DEFAULT_S3_REGION);
                assert!(s3.access_key.is_none());
            },
            other => panic!("unexpected backend: {:?}", other),
        }
    }
}
