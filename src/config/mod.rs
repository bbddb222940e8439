//! Database configuration loaded from JSON.
//!
//! ```json
//! {
//!   "backend": { "protocol": "sqlite", "path": "data/app.db" },
//!   "pool": { "max_size": 4, "connection_timeout_secs": 10 }
//! }
//! ```
//!
//! `pool` and each of its fields are optional.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::database::{Backend, Protocol};
pub use crate::driver::PoolSettings;

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid database configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no built-in driver for the {0} protocol")]
    UnsupportedBackend(Protocol),
}

/// Everything needed to build a [`Database`](crate::database::Database).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    pub backend: Backend,
    #[serde(default)]
    pub pool: PoolSettings,
}

impl DatabaseConfig {
    /// A configuration for `backend` with default pool settings.
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            pool: PoolSettings::default(),
        }
    }

    /// Parses a configuration from JSON text.
    ///
    /// # Examples
    ///
    /// ```
    /// use basicsql::config::DatabaseConfig;
    /// use basicsql::database::Backend;
    ///
    /// let config = DatabaseConfig::from_json_str(
    ///     r#"{ "backend": { "protocol": "sqlite" } }"#,
    /// ).unwrap();
    /// assert_eq!(config.backend, Backend::sqlite_memory());
    /// assert_eq!(config.pool.max_size, 10);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        debug!(path = %path.display(), protocol = %config.backend.protocol(), "loaded database configuration");
        Ok(config)
    }
}
