//! # Node Configuration
//!
//! Optional TOML file with two tables:
//!
//! ```toml
//! [ledger]
//! max_mint_per_transaction = 100000000   # minor units
//! max_reference_length = 256
//! flush_on_commit = true
//!
//! [server]
//! bind = "127.0.0.1"
//! api_port = 9841
//! metrics_port = 9842
//! audit_interval_secs = 30
//! ```
//!
//! Every key is optional. When `--config` is not given, `config.toml` in the
//! data directory is used if present.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use real_digital_protocol::LedgerConfig;

/// File name looked up in the data directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub ledger: LedgerConfig,
    pub server: ServerConfig,
}

/// Listener and background-task settings for `serve`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface both listeners bind to.
    pub bind: String,
    pub api_port: u16,
    pub metrics_port: u16,
    /// Seconds between background audits.
    pub audit_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            api_port: 9841,
            metrics_port: 9842,
            audit_interval_secs: 30,
        }
    }
}

impl NodeConfig {
    /// Load `explicit`, or `<data_dir>/config.toml` when it exists, or the
    /// defaults.
    pub fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = data_dir.join(DEFAULT_CONFIG_FILE);
                if !candidate.exists() {
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = NodeConfig::from_toml_str("").unwrap();
        assert_eq!(config, NodeConfig::default());
        assert_eq!(config.server.api_port, 9841);
        assert!(config.ledger.flush_on_commit);
    }

    #[test]
    fn partial_tables_override_only_named_keys() {
        let config = NodeConfig::from_toml_str(
            r#"
            [ledger]
            max_mint_per_transaction = 5000

            [server]
            api_port = 8080
            "#,
        )
        .unwrap();
        assert_eq!(config.ledger.max_mint_per_transaction, 5000);
        assert_eq!(config.ledger.max_reference_length, 256);
        assert_eq!(config.server.api_port, 8080);
        assert_eq!(config.server.metrics_port, 9842);
    }

    #[test]
    fn default_round_trips_through_toml() {
        let config = NodeConfig::default();
        let parsed = NodeConfig::from_toml_str(&toml::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn unknown_value_type_is_rejected() {
        assert!(NodeConfig::from_toml_str("[server]\napi_port = \"http\"").is_err());
    }

    #[test]
    fn missing_default_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig::load(None, dir.path()).unwrap();
        assert_eq!(config, NodeConfig::default());

        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[server]\naudit_interval_secs = 5\n",
        )
        .unwrap();
        let config = NodeConfig::load(None, dir.path()).unwrap();
        assert_eq!(config.server.audit_interval_secs, 5);
    }
}
