//! Supported networks and their chain identifiers.
//!
//! Networks are enumerated exhaustively: a payment can only be verified, and a
//! provisioning workflow only driven, on a chain listed here. Unknown selector
//! strings are rejected at the boundary instead of falling through a lookup
//! table at runtime.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// EVM-compatible networks payments can settle on.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    /// Ethereum mainnet (chain ID 1).
    #[serde(rename = "mainnet")]
    Mainnet,
    /// Arbitrum One (chain ID 42161).
    #[serde(rename = "arbitrum")]
    Arbitrum,
    /// Base mainnet (chain ID 8453).
    #[serde(rename = "base")]
    Base,
    /// OP Mainnet (chain ID 10).
    #[serde(rename = "optimism")]
    Optimism,
    /// Base Sepolia testnet (chain ID 84532), where provisioning contracts live.
    #[serde(rename = "base-sepolia")]
    BaseSepolia,
}

impl Network {
    /// Return all known [`Network`] variants.
    pub fn variants() -> &'static [Network] {
        &[
            Network::Mainnet,
            Network::Arbitrum,
            Network::Base,
            Network::Optimism,
            Network::BaseSepolia,
        ]
    }

    /// EIP-155 chain ID.
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Arbitrum => 42161,
            Network::Base => 8453,
            Network::Optimism => 10,
            Network::BaseSepolia => 84532,
        }
    }

    /// Symbol of the chain's base currency, transferred without a token contract.
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Network::Mainnet
            | Network::Arbitrum
            | Network::Base
            | Network::Optimism
            | Network::BaseSepolia => "ETH",
        }
    }

    /// Resolve a network from its selector name, if known.
    pub fn from_name(name: &str) -> Option<Network> {
        Network::variants()
            .iter()
            .find(|network| network.to_string() == name)
            .copied()
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Arbitrum => write!(f, "arbitrum"),
            Network::Base => write!(f, "base"),
            Network::Optimism => write!(f, "optimism"),
            Network::BaseSepolia => write!(f, "base-sepolia"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::from_name(s).ok_or_else(|| format!("unknown network '{}'", s))
    }
}
