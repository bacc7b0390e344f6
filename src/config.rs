//! Configuration management for CitizenChain

use crate::error::ChainError;
use crate::policy::GENESIS_ADMIN;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub governance: GovernanceConfig,
    #[serde(default)]
    pub block_production: BlockProductionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_api_host")]
    pub api_host: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GovernanceConfig {
    /// Identities granted every administrative permission
    #[serde(default = "default_admins")]
    pub admins: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BlockProductionConfig {
    /// Seconds between automatic block cuts. `None` leaves cutting to `POST /blocks/cut`.
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
            api_port: default_api_port(),
        }
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            admins: default_admins(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_node_id() -> String {
    "node-1".to_string()
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_admins() -> Vec<String> {
    vec![GENESIS_ADMIN.to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ChainError> {
        Ok(toml::from_str(s)?)
    }

    /// Applies `NODE_ID`, `API_PORT`, `CITIZEN_ADMINS` and `BLOCK_INTERVAL_SECS`
    /// as resolved by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ChainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(node_id) = lookup("NODE_ID") {
            self.node.node_id = node_id;
        }

        if let Some(port) = lookup("API_PORT") {
            self.network.api_port = port
                .trim()
                .parse()
                .map_err(|e| ChainError::Config(format!("API_PORT {:?}: {}", port, e)))?;
        }

        if let Some(admins) = lookup("CITIZEN_ADMINS") {
            self.governance.admins = admins
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(interval) = lookup("BLOCK_INTERVAL_SECS") {
            let secs = interval.trim().parse().map_err(|e| {
                ChainError::Config(format!("BLOCK_INTERVAL_SECS {:?}: {}", interval, e))
            })?;
            self.block_production.interval_secs = Some(secs);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.node.node_id.trim().is_empty() {
            return Err(ChainError::Config("node.node_id must be set".to_string()));
        }
        if self.network.api_port == 0 {
            return Err(ChainError::Config("network.api_port must be non-zero".to_string()));
        }
        if self.governance.admins.is_empty() {
            return Err(ChainError::Config(
                "governance.admins must name at least one administrator".to_string(),
            ));
        }
        if self.block_production.interval_secs == Some(0) {
            return Err(ChainError::Config(
                "block_production.interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.network.api_host, self.network.api_port)
    }
}

/// Reads `path` (defaults when the file is absent), applies environment
/// overrides and validates the result.
pub fn load_config(path: &Path) -> Result<Config, ChainError> {
    let mut config = if path.exists() {
        Config::from_toml_str(&fs::read_to_string(path)?)?
    } else {
        Config::default()
    };

    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}
