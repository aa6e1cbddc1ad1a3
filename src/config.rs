//! Pipeline configuration.
//!
//! Settings are read from an optional JSON file; every field has a default
//! so a partial (or absent) file is valid.

use crate::bio::Rank;
use crate::database::remote::DEFAULT_BASE_URL;
use crate::database::{DatabaseError, TaxonomyResolver, UnipeptClient};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Remote taxonomy service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Memoise remote answers for the duration of a run.
    pub cache: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            enabled: true,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            cache: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub remote: RemoteConfig,
    pub ranks: Vec<Rank>,
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            remote: RemoteConfig::default(),
            ranks: Rank::DEFAULT_RANKS.to_vec(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl PipelineConfig {
    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path.as_ref())?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        info!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Builds the taxonomy resolver these settings describe.
    pub fn build_resolver(&self) -> Result<TaxonomyResolver, DatabaseError> {
        if !self.remote.enabled {
            info!("Remote taxonomy lookups disabled");
            return Ok(TaxonomyResolver::local_only());
        }
        let client = UnipeptClient::new(
            &self.remote.base_url,
            Duration::from_secs(self.remote.timeout_secs),
        )?;
        Ok(TaxonomyResolver::with_remote(Box::new(client), self.remote.cache))
    }
}
