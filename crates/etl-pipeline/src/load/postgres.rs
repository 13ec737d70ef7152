//! PostgreSQL database sink
//!
//! Each artifact is a JSON array of records. Every record becomes one JSONB
//! row of the target table; an artifact is inserted in a single transaction.

use async_trait::async_trait;
use etl_common::{EtlError, Record, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::config::DatabaseConfig;
use super::processor::DbSink;
use crate::storage::Sink;

/// PostgreSQL's identifier length limit (NAMEDATALEN - 1)
const MAX_IDENTIFIER_LEN: usize = 63;

pub struct PostgresSink {
    pool: PgPool,
    files: Arc<dyn Sink>,
    create_tables: bool,
}

impl PostgresSink {
    pub fn new(pool: PgPool, files: Arc<dyn Sink>, create_tables: bool) -> Self {
        Self {
            pool,
            files,
            create_tables,
        }
    }

    /// Open a pool for `config` and read artifacts from `files`
    pub async fn connect(config: &DatabaseConfig, files: Arc<dyn Sink>) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(database_error)?;

        info!("Database connection pool established");

        Ok(Self::new(pool, files, config.create_tables))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DbSink for PostgresSink {
    #[instrument(skip(self))]
    async fn insert(&self, artifact: &str, table: &str) -> Result<()> {
        validate_table_name(table)?;

        let data = self.files.read(artifact).await?;
        let records = decode_batch(&data)?;

        let mut tx = self.pool.begin().await.map_err(database_error)?;

        if self.create_tables {
            sqlx::query(&create_table_sql(table))
                .execute(&mut *tx)
                .await
                .map_err(database_error)?;
        }

        let insert = format!(r#"INSERT INTO "{}" (artifact, payload) VALUES ($1, $2)"#, table);
        for record in &records {
            sqlx::query(&insert)
                .bind(artifact)
                .bind(Json(record))
                .execute(&mut *tx)
                .await
                .map_err(database_error)?;
        }

        tx.commit().await.map_err(database_error)?;

        debug!(rows = records.len(), "Inserted artifact rows");
        Ok(())
    }
}

fn database_error(e: sqlx::Error) -> EtlError {
    EtlError::database(e.to_string())
}

/// Table names are interpolated into SQL, so only plain identifiers pass
fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && table.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(EtlError::database(format!("invalid table name: {:?}", table)))
    }
}

fn create_table_sql(table: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS "{}" (
            id BIGSERIAL PRIMARY KEY,
            artifact TEXT NOT NULL,
            payload JSONB NOT NULL,
            loaded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
        table
    )
}

fn decode_batch(data: &[u8]) -> Result<Vec<Record>> {
    serde_json::from_slice(data)
        .map_err(|e| EtlError::decode(format!("artifact is not a JSON array of objects: {}", e)))
}
