//! Load stage configuration

use serde::{Deserialize, Serialize};

use super::table_mapper::TableConfig;

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Create missing target tables before inserting
    #[serde(default = "default_true")]
    pub create_tables: bool,
}

fn default_max_connections() -> u32 {
    DEFAULT_DATABASE_MAX_CONNECTIONS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

/// Everything the `load` command needs besides storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    pub tables: TableConfig,
    pub database: DatabaseConfig,
}

impl LoadConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.tables.prefix_table_map.is_empty() {
            tracing::warn!("No prefix to table mappings configured - every artifact will fail to route");
        }

        Ok(())
    }
}
