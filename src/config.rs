//! Typed configuration, constructed once at startup and passed by reference.
//!
//! The core never reads the process environment: the host deserializes a
//! [`Config`] from JSON (or builds one directly), hands signing credentials
//! in as explicit values, and passes everything down by reference. No
//! process-wide singletons.

use alloy_primitives::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::network::Network;

/// Top-level configuration.
///
/// ```json
/// {
///   "vault": "0x468Bb7921b7B63c2C6c9303D2cDA3522c56902C8",
///   "confirmations": 2,
///   "chains": {
///     "mainnet": { "rpc": "https://eth.example.com" },
///     "base-sepolia": {
///       "rpc": "https://sepolia.base.example.com",
///       "factory": "0x857a11Ce72A0eaCE023eF01d3f174685Adb13679",
///       "price_feed": "0x4aDC67696bA383F43DD60A9e78F2C97Fbbfc7cb1"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Collection address designated to receive bundle payments.
    pub vault: Address,
    /// Block depth required before a submitted mutation is trusted.
    #[serde(default = "config_defaults::default_confirmations")]
    pub confirmations: u64,
    /// Per-network client settings, keyed by network name.
    #[serde(default)]
    pub chains: HashMap<Network, ChainSettings>,
}

/// Settings for one network's RPC client.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSettings {
    /// JSON-RPC endpoint.
    pub rpc: Url,
    /// Device-wallet factory deployment; present on provisioning networks.
    #[serde(default)]
    pub factory: Option<Address>,
    /// Native/USD price feed aggregator; present where purchases are priced.
    #[serde(default)]
    pub price_feed: Option<Address>,
    /// Client-side cap on the confirmation wait. Expiry is recoverable: the
    /// mutation may have landed, so the host reconciles before retrying.
    #[serde(default = "config_defaults::default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
}

pub mod config_defaults {
    pub const DEFAULT_CONFIRMATIONS: u64 = 2;
    pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 30;

    pub fn default_confirmations() -> u64 {
        DEFAULT_CONFIRMATIONS
    }

    pub fn default_receipt_timeout_secs() -> u64 {
        DEFAULT_RECEIPT_TIMEOUT_SECS
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Settings for a network, if configured.
    pub fn chain(&self, network: Network) -> Option<&ChainSettings> {
        self.chains.get(&network)
    }
}
