//! Local directory sink

use async_trait::async_trait;
use etl_common::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use super::Sink;

/// Stores each artifact as a file directly under `root`
#[derive(Debug, Clone)]
pub struct FileSystemSink {
    root: PathBuf,
}

impl FileSystemSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl Sink for FileSystemSink {
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn write(&self, data: Vec<u8>, name: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.path_for(name), data).await?;
        debug!(root = %self.root.display(), "Wrote artifact");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.path_for(name)).await?)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        names.sort();
        Ok(names)
    }

    #[instrument(skip(self))]
    async fn delete(&self, name: &str) -> Result<()> {
        tokio::fs::remove_file(self.path_for(name)).await?;
        Ok(())
    }
}
