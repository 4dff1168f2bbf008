use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

/// Environment variable naming the config file when no CLI argument is given
pub const CONFIG_ENV: &str = "SFTP_ADAPTER_CONFIG";

/// Configuration for the adapter process
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterConfig {
    /// Bus address this adapter answers on
    pub address: String,
    /// Buffer size for upload read/write operations in bytes
    pub io_size: usize,
    /// Port used when a request carries none
    pub default_port: u16,
}

impl Default for AdapterConfig {
    /// - address: "sftp"
    /// - io_size: 65536 (64KB)
    /// - default_port: 22
    fn default() -> Self {
        Self {
            address: "sftp".to_string(),
            io_size: 65536,
            default_port: 22,
        }
    }
}

impl AdapterConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads the config file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.address.is_empty() {
            return Err(ConfigError::Invalid("address must not be empty".into()));
        }
        if self.io_size == 0 {
            return Err(ConfigError::Invalid("io_size must be positive".into()));
        }
        if self.default_port == 0 {
            return Err(ConfigError::Invalid("default_port must be positive".into()));
        }
        Ok(())
    }
}
