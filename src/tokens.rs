//! Known fungible-token deployments and decimal resolution.
//!
//! The registry of token deployments is static: chain, symbol, contract
//! address, and canonical decimal precision are fixed at compile time, so a
//! lookup miss is a typed [`None`] handled at the call boundary rather than a
//! runtime surprise.

use alloy_primitives::{Address, U256, address};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use crate::network::Network;

/// Fungible tokens accepted as payment.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenSymbol {
    #[serde(rename = "USDC")]
    Usdc,
    #[serde(rename = "USDT")]
    Usdt,
    #[serde(rename = "DAI")]
    Dai,
}

impl TokenSymbol {
    /// Canonical smallest-unit precision for the symbol.
    pub fn canonical_decimals(&self) -> u8 {
        match self {
            TokenSymbol::Usdc | TokenSymbol::Usdt => 6,
            TokenSymbol::Dai => 18,
        }
    }

    /// Resolve a symbol case-insensitively, if known.
    pub fn from_symbol(symbol: &str) -> Option<TokenSymbol> {
        match symbol.to_ascii_uppercase().as_str() {
            "USDC" => Some(TokenSymbol::Usdc),
            "USDT" => Some(TokenSymbol::Usdt),
            "DAI" => Some(TokenSymbol::Dai),
            _ => None,
        }
    }
}

impl Display for TokenSymbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSymbol::Usdc => write!(f, "USDC"),
            TokenSymbol::Usdt => write!(f, "USDT"),
            TokenSymbol::Dai => write!(f, "DAI"),
        }
    }
}

/// A token contract deployment on a specific network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDeployment {
    pub network: Network,
    pub symbol: TokenSymbol,
    pub address: Address,
    pub decimals: u8,
}

static KNOWN_DEPLOYMENTS: &[TokenDeployment] = &[
    // USDC
    TokenDeployment {
        network: Network::Mainnet,
        symbol: TokenSymbol::Usdc,
        address: address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
        decimals: 6,
    },
    TokenDeployment {
        network: Network::Arbitrum,
        symbol: TokenSymbol::Usdc,
        address: address!("0xaf88d065e77c8cC2239327C5EDb3A432268e5831"),
        decimals: 6,
    },
    TokenDeployment {
        network: Network::Base,
        symbol: TokenSymbol::Usdc,
        address: address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
        decimals: 6,
    },
    TokenDeployment {
        network: Network::Optimism,
        symbol: TokenSymbol::Usdc,
        address: address!("0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85"),
        decimals: 6,
    },
    // USDT
    TokenDeployment {
        network: Network::Mainnet,
        symbol: TokenSymbol::Usdt,
        address: address!("0xdAC17F958D2ee523a2206206994597C13D831ec7"),
        decimals: 6,
    },
    // DAI
    TokenDeployment {
        network: Network::Mainnet,
        symbol: TokenSymbol::Dai,
        address: address!("0x6B175474E89094C44Da98b954EedeAC495271d0F"),
        decimals: 18,
    },
];

/// Lazy hashmap: (network, symbol) -> deployment
static DEPLOYMENT_INDEX: Lazy<HashMap<(Network, TokenSymbol), &'static TokenDeployment>> =
    Lazy::new(|| {
        KNOWN_DEPLOYMENTS
            .iter()
            .map(|d| ((d.network, d.symbol), d))
            .collect()
    });

/// Look up the deployment of `symbol` on `network`, if any.
pub fn deployment(network: Network, symbol: TokenSymbol) -> Option<&'static TokenDeployment> {
    DEPLOYMENT_INDEX.get(&(network, symbol)).copied()
}

/// Resolves the decimal precision used to scale a raw transferred integer.
pub trait DecimalPolicy: Send + Sync {
    fn resolve(&self, deployment: &TokenDeployment, raw_value: U256) -> u8;
}

/// Smallest-unit precision forced when a raw value's magnitude implies it.
const FORCED_DECIMALS: u8 = 18;

/// Decimal digit count at which the forced interpretation kicks in.
const MAGNITUDE_DIGITS: usize = 18;

/// Canonical precision for the symbol, unless the raw integer's decimal-digit
/// length is at or above 18, which forces an 18-decimal interpretation.
/// Swap-routed transfers deliver raw values at that magnitude even for
/// nominally 6-decimal tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagnitudeOverride;

impl DecimalPolicy for MagnitudeOverride {
    fn resolve(&self, deployment: &TokenDeployment, raw_value: U256) -> u8 {
        if raw_value.to_string().len() >= MAGNITUDE_DIGITS {
            FORCED_DECIMALS
        } else {
            deployment.decimals
        }
    }
}

/// Always the canonical precision for the symbol. Drop-in replacement for
/// [`MagnitudeOverride`] once a per-token registry is trusted end to end.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalOnly;

impl DecimalPolicy for CanonicalOnly {
    fn resolve(&self, deployment: &TokenDeployment, _raw_value: U256) -> u8 {
        deployment.decimals
    }
}
