//! Configuration management
//!
//! One file (TOML, YAML or JSON, picked by extension) layered with
//! `ETL__`-prefixed environment variables, e.g.
//! `ETL__EXTRACT__DOWNLOADER__URL=https://...` or
//! `ETL__STORAGE__ROOT=/data/raw`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::extract::ExtractConfig;
use crate::load::LoadConfig;
use crate::storage::StorageConfig;

/// Config file used when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "resources/config.toml";

/// Prefix of environment variables overriding file values.
pub const ENV_PREFIX: &str = "ETL";

/// Nesting separator in environment variable names.
pub const ENV_SEPARATOR: &str = "__";

/// Whole-process configuration; each command reads the section it needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub extract: Option<ExtractConfig>,
    #[serde(default)]
    pub load: Option<LoadConfig>,
}

impl PipelineConfig {
    /// Load `path`, then apply environment overrides (a `.env` file is honoured)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("could not read config file {}", path.display()))?;

        settings
            .try_deserialize()
            .context("could not unmarshal config")
    }

    /// The validated `[extract]` section
    pub fn extract_config(&self) -> Result<&ExtractConfig> {
        let extract = self
            .extract
            .as_ref()
            .context("config has no [extract] section")?;
        extract.validate()?;
        Ok(extract)
    }

    /// The validated `[load]` section
    pub fn load_config(&self) -> Result<&LoadConfig> {
        let load = self.load.as_ref().context("config has no [load] section")?;
        load.validate()?;
        Ok(load)
    }
}
