//! Load orchestration: list, route, insert

use async_trait::async_trait;
use etl_common::{EtlError, Result};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

use super::table_mapper::{TableMapError, TableMapper};
use crate::storage::Sink;

/// Database side of the load stage
#[async_trait]
pub trait DbSink: Send + Sync {
    /// Load the artifact named `artifact` into `table`
    async fn insert(&self, artifact: &str, table: &str) -> Result<()>;
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("could not list files for processing: {0}")]
    List(#[source] EtlError),

    #[error("could not map file name {artifact} into table: {source}")]
    Mapping {
        artifact: String,
        #[source]
        source: TableMapError,
    },

    #[error("could not insert {artifact} into {table}: {source}")]
    Insert {
        artifact: String,
        table: String,
        #[source]
        source: EtlError,
    },
}

/// Feeds every artifact in a sink to the database, stopping at the first failure
pub struct Processor {
    files: Arc<dyn Sink>,
    db: Arc<dyn DbSink>,
    mapper: TableMapper,
}

impl Processor {
    pub fn new(files: Arc<dyn Sink>, db: Arc<dyn DbSink>, mapper: TableMapper) -> Self {
        Self { files, db, mapper }
    }

    /// Returns how many artifacts were loaded
    #[instrument(skip(self))]
    pub async fn process_files(&self) -> std::result::Result<usize, ProcessError> {
        let artifacts = self.files.list().await.map_err(ProcessError::List)?;
        info!(count = artifacts.len(), "Processing artifacts");

        for artifact in &artifacts {
            let table = self
                .mapper
                .get_table(artifact)
                .map_err(|source| ProcessError::Mapping {
                    artifact: artifact.clone(),
                    source,
                })?;

            self.db
                .insert(artifact, table)
                .await
                .map_err(|source| ProcessError::Insert {
                    artifact: artifact.clone(),
                    table: table.to_string(),
                    source,
                })?;

            info!(artifact = %artifact, table, "Loaded artifact");
        }

        Ok(artifacts.len())
    }
}
