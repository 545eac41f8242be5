//! Asset transfer verification.
//!
//! Given a transaction reference, a chain selector, an asset selector, and a
//! vault address, [`TransferVerifier`] determines how much of that asset the
//! transaction delivered to the vault. The component is read-only and
//! side-effect-free beyond network queries, so callers may retry freely.

use alloy_primitives::{Address, B256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::instrument;

use crate::chain::{ChainRpc, RpcFailure};
use crate::contracts::IERC20;
use crate::convert::{CurrencyConverter, units_to_decimal};
use crate::network::Network;
use crate::oracle::{OracleError, PriceFeed};
use crate::tokens::{self, DecimalPolicy, MagnitudeOverride, TokenSymbol};

/// A payment to check against the vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferQuery {
    /// Hash of the settlement transaction.
    pub transaction: B256,
    /// Network selector name, e.g. "mainnet" or "base".
    pub network: String,
    /// Asset symbol, e.g. "ETH" or "USDC".
    pub asset: String,
    /// Vault address as supplied by the caller; normalized before comparison.
    pub vault: String,
}

/// Quantity of an asset delivered to the vault. An amount of zero means no
/// matching transfer was found, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferResult {
    pub amount: Decimal,
    /// Denomination of `amount`: the queried token symbol, or
    /// "USD in <native>" for converted native-asset payments.
    pub asset: String,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),
    #[error("Token {symbol} not supported on {network}")]
    UnsupportedToken { symbol: String, network: Network },
    #[error("Invalid vault address: {0}")]
    InvalidAddress(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(B256),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Rpc(#[from] RpcFailure),
}

/// Verifies asset transfers to the vault across networks and asset types.
pub struct TransferVerifier<C, F, D = MagnitudeOverride> {
    rpcs: HashMap<Network, C>,
    converter: CurrencyConverter<F>,
    decimals: D,
}

impl<C, F> TransferVerifier<C, F, MagnitudeOverride> {
    /// Verifier with the default decimal-resolution policy.
    pub fn new(rpcs: HashMap<Network, C>, converter: CurrencyConverter<F>) -> Self {
        TransferVerifier {
            rpcs,
            converter,
            decimals: MagnitudeOverride,
        }
    }
}

impl<C, F, D> TransferVerifier<C, F, D> {
    /// Swap the decimal-resolution strategy without touching verification logic.
    pub fn with_decimal_policy<D2: DecimalPolicy>(self, decimals: D2) -> TransferVerifier<C, F, D2> {
        TransferVerifier {
            rpcs: self.rpcs,
            converter: self.converter,
            decimals,
        }
    }
}

impl<C, F, D> TransferVerifier<C, F, D>
where
    C: ChainRpc,
    F: PriceFeed,
    D: DecimalPolicy,
{
    /// Determine the quantity of the queried asset delivered to the vault in
    /// the referenced transaction.
    #[instrument(skip_all, err, fields(
        tx = %query.transaction,
        network = %query.network,
        asset = %query.asset,
    ))]
    pub async fn verify_transfer(&self, query: &TransferQuery) -> Result<TransferResult, VerifyError> {
        let network = Network::from_name(query.network.trim())
            .ok_or_else(|| VerifyError::UnsupportedNetwork(query.network.clone()))?;
        let rpc = self
            .rpcs
            .get(&network)
            .ok_or_else(|| VerifyError::UnsupportedNetwork(query.network.clone()))?;
        let vault = Address::from_str(query.vault.trim())
            .map_err(|_| VerifyError::InvalidAddress(query.vault.clone()))?;
        let symbol = query.asset.trim().to_ascii_uppercase();

        if symbol == network.native_symbol() {
            self.native_amount(rpc, network, query.transaction, vault).await
        } else {
            self.token_amount(rpc, network, &symbol, query.transaction, vault)
                .await
        }
    }

    /// Native-asset path: the transaction's direct recipient and value decide.
    async fn native_amount(
        &self,
        rpc: &C,
        network: Network,
        hash: B256,
        vault: Address,
    ) -> Result<TransferResult, VerifyError> {
        let transaction = rpc
            .transaction_by_hash(hash)
            .await?
            .ok_or(VerifyError::TransactionNotFound(hash))?;
        let asset = format!("USD in {}", network.native_symbol());

        let delivered = match transaction.to {
            Some(to) if to == vault && !transaction.value.is_zero() => transaction.value,
            _ => {
                return Ok(TransferResult {
                    amount: Decimal::ZERO,
                    asset,
                });
            }
        };

        let usd = self.converter.wei_to_usd(delivered).await?;
        tracing::info!(tx = %hash, wei = %delivered, usd = %usd, "Native transfer to vault");
        Ok(TransferResult {
            amount: usd.0,
            asset,
        })
    }

    /// Token path: sum every decoded transfer event delivering to the vault.
    async fn token_amount(
        &self,
        rpc: &C,
        network: Network,
        symbol: &str,
        hash: B256,
        vault: Address,
    ) -> Result<TransferResult, VerifyError> {
        let deployment = TokenSymbol::from_symbol(symbol)
            .and_then(|s| tokens::deployment(network, s))
            .ok_or_else(|| VerifyError::UnsupportedToken {
                symbol: symbol.to_string(),
                network,
            })?;
        let receipt = rpc
            .receipt_by_hash(hash)
            .await?
            .ok_or(VerifyError::TransactionNotFound(hash))?;

        let mut total = Decimal::ZERO;
        for log in &receipt.logs {
            // Every Transfer in the receipt counts, whichever contract emitted
            // it: swap-routed payments deliver through intermediate pools.
            let Ok(decoded) = log.log_decode::<IERC20::Transfer>() else {
                continue;
            };
            let transfer = decoded.inner;
            if transfer.to != vault {
                continue;
            }
            let decimals = self.decimals.resolve(deployment, transfer.value);
            match units_to_decimal(transfer.value, decimals) {
                Ok(amount) => {
                    tracing::debug!(tx = %hash, raw = %transfer.value, decimals, %amount, "Transfer to vault");
                    total += amount;
                }
                Err(reason) => {
                    tracing::warn!(tx = %hash, raw = %transfer.value, %reason, "Skipping unscalable transfer value");
                }
            }
        }
        Ok(TransferResult {
            amount: total,
            asset: symbol.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::{MockRpc, log_at};
    use crate::chain::{ConfirmedReceipt, TransactionSummary};
    use crate::oracle::testing::FixedFeed;
    use crate::tokens::CanonicalOnly;
    use alloy_primitives::{Bytes, LogData, U256, address};
    use alloy_sol_types::SolEvent;

    const VAULT: Address = address!("0x468Bb7921b7B63c2C6c9303D2cDA3522c56902C8");
    const PAYER: Address = address!("0x857a11Ce72A0eaCE023eF01d3f174685Adb13679");
    const USDC_MAINNET: Address = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

    fn tx_hash(byte: u8) -> B256 {
        B256::repeat_byte(byte)
    }

    fn verifier(rpc: MockRpc, network: Network) -> TransferVerifier<MockRpc, FixedFeed> {
        let converter = CurrencyConverter::new(FixedFeed(Decimal::from(3000)));
        TransferVerifier::new(HashMap::from([(network, rpc)]), converter)
    }

    fn query(network: &str, asset: &str, hash: B256) -> TransferQuery {
        TransferQuery {
            transaction: hash,
            network: network.to_string(),
            asset: asset.to_string(),
            vault: VAULT.to_string(),
        }
    }

    fn transfer_data(from: Address, to: Address, value: U256) -> LogData {
        IERC20::Transfer { from, to, value }.encode_log_data()
    }

    fn receipt_with_logs(hash: B256, logs: Vec<LogData>) -> ConfirmedReceipt {
        ConfirmedReceipt {
            transaction_hash: hash,
            block_number: 100,
            status: true,
            logs: logs
                .into_iter()
                .map(|data| log_at(USDC_MAINNET, 100, data))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_native_transfer_to_vault_reports_usd() {
        let hash = tx_hash(0x11);
        let rpc = MockRpc::new(Address::ZERO).with_transaction(
            hash,
            TransactionSummary {
                to: Some(VAULT),
                value: U256::from(2_000_000_000_000_000_000u128), // 2 ETH
            },
        );
        let result = verifier(rpc, Network::Mainnet)
            .verify_transfer(&query("mainnet", "ETH", hash))
            .await
            .unwrap();
        assert_eq!(result.asset, "USD in ETH");
        assert_eq!(result.amount, Decimal::from(6000));
    }

    #[tokio::test]
    async fn test_native_transfer_elsewhere_is_zero_not_error() {
        let hash = tx_hash(0x12);
        let rpc = MockRpc::new(Address::ZERO).with_transaction(
            hash,
            TransactionSummary {
                to: Some(PAYER),
                value: U256::from(1_000_000_000_000_000_000u128),
            },
        );
        let result = verifier(rpc, Network::Mainnet)
            .verify_transfer(&query("mainnet", "ETH", hash))
            .await
            .unwrap();
        assert_eq!(result.amount, Decimal::ZERO);
        assert_eq!(result.asset, "USD in ETH");
    }

    #[tokio::test]
    async fn test_native_zero_value_is_zero() {
        let hash = tx_hash(0x13);
        let rpc = MockRpc::new(Address::ZERO).with_transaction(
            hash,
            TransactionSummary {
                to: Some(VAULT),
                value: U256::ZERO,
            },
        );
        let result = verifier(rpc, Network::Mainnet)
            .verify_transfer(&query("mainnet", "ETH", hash))
            .await
            .unwrap();
        assert_eq!(result.amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_token_transfer_at_canonical_decimals() {
        let hash = tx_hash(0x21);
        // 1.0 USDC: six decimal digits, canonical 6-decimal interpretation.
        let rpc = MockRpc::new(Address::ZERO).with_receipt(
            hash,
            receipt_with_logs(hash, vec![transfer_data(PAYER, VAULT, U256::from(1_000_000u64))]),
        );
        let result = verifier(rpc, Network::Mainnet)
            .verify_transfer(&query("mainnet", "USDC", hash))
            .await
            .unwrap();
        assert_eq!(result.asset, "USDC");
        assert_eq!(result.amount, Decimal::ONE);
    }

    #[tokio::test]
    async fn test_token_transfer_magnitude_forces_18_decimals() {
        let hash = tx_hash(0x22);
        // 19 decimal digits: forced 18-decimal interpretation despite USDC's
        // canonical 6.
        let raw = U256::from(10u8).pow(U256::from(18u8));
        let rpc = MockRpc::new(Address::ZERO).with_receipt(
            hash,
            receipt_with_logs(hash, vec![transfer_data(PAYER, VAULT, raw)]),
        );
        let result = verifier(rpc, Network::Mainnet)
            .verify_transfer(&query("mainnet", "USDC", hash))
            .await
            .unwrap();
        assert_eq!(result.amount, Decimal::ONE);
    }

    #[tokio::test]
    async fn test_canonical_only_policy_ignores_magnitude() {
        let hash = tx_hash(0x23);
        let raw = U256::from(10u8).pow(U256::from(18u8));
        let rpc = MockRpc::new(Address::ZERO).with_receipt(
            hash,
            receipt_with_logs(hash, vec![transfer_data(PAYER, VAULT, raw)]),
        );
        let converter = CurrencyConverter::new(FixedFeed(Decimal::from(3000)));
        let verifier = TransferVerifier::new(
            HashMap::from([(Network::Mainnet, rpc)]),
            converter,
        )
        .with_decimal_policy(CanonicalOnly);
        let result = verifier
            .verify_transfer(&query("mainnet", "USDC", hash))
            .await
            .unwrap();
        // 10^18 at 6 decimals is 10^12 whole tokens.
        assert_eq!(result.amount, Decimal::from(1_000_000_000_000u64));
    }

    #[tokio::test]
    async fn test_token_transfers_sum_and_skip_foreign_logs() {
        let hash = tx_hash(0x24);
        let unrelated = LogData::new_unchecked(vec![B256::repeat_byte(0x99)], Bytes::new());
        let logs = vec![
            transfer_data(PAYER, VAULT, U256::from(1_000_000u64)),  // 1.0
            unrelated,                                              // skipped
            transfer_data(PAYER, PAYER, U256::from(9_000_000u64)),  // wrong recipient
            transfer_data(PAYER, VAULT, U256::from(2_500_000u64)),  // 2.5
        ];
        let rpc =
            MockRpc::new(Address::ZERO).with_receipt(hash, receipt_with_logs(hash, logs));
        let result = verifier(rpc, Network::Mainnet)
            .verify_transfer(&query("mainnet", "USDC", hash))
            .await
            .unwrap();
        assert_eq!(result.amount, Decimal::from_str("3.5").unwrap());
    }

    #[tokio::test]
    async fn test_token_without_matching_event_is_zero() {
        let hash = tx_hash(0x25);
        let rpc = MockRpc::new(Address::ZERO).with_receipt(hash, receipt_with_logs(hash, vec![]));
        let result = verifier(rpc, Network::Mainnet)
            .verify_transfer(&query("mainnet", "USDC", hash))
            .await
            .unwrap();
        assert_eq!(result.amount, Decimal::ZERO);
        assert_eq!(result.asset, "USDC");
    }

    #[tokio::test]
    async fn test_unknown_network_rejected() {
        let hash = tx_hash(0x31);
        let rpc = MockRpc::new(Address::ZERO);
        let err = verifier(rpc, Network::Mainnet)
            .verify_transfer(&query("polygon", "ETH", hash))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::UnsupportedNetwork(name) if name == "polygon"));
    }

    #[tokio::test]
    async fn test_known_network_without_client_rejected() {
        let hash = tx_hash(0x32);
        let rpc = MockRpc::new(Address::ZERO);
        let err = verifier(rpc, Network::Mainnet)
            .verify_transfer(&query("base", "ETH", hash))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::UnsupportedNetwork(_)));
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let hash = tx_hash(0x33);
        let rpc = MockRpc::new(Address::ZERO);
        let err = verifier(rpc, Network::Mainnet)
            .verify_transfer(&query("mainnet", "WBTC", hash))
            .await
            .unwrap_err();
        assert!(
            matches!(err, VerifyError::UnsupportedToken { symbol, network }
                if symbol == "WBTC" && network == Network::Mainnet)
        );
    }

    #[tokio::test]
    async fn test_token_missing_on_chain_rejected() {
        let hash = tx_hash(0x34);
        let rpc = MockRpc::new(Address::ZERO);
        // DAI is only deployed on mainnet in the registry.
        let err = verifier(rpc, Network::Base)
            .verify_transfer(&query("base", "DAI", hash))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::UnsupportedToken { .. }));
    }

    #[tokio::test]
    async fn test_malformed_vault_rejected() {
        let hash = tx_hash(0x35);
        let rpc = MockRpc::new(Address::ZERO);
        let mut q = query("mainnet", "ETH", hash);
        q.vault = "not-an-address".to_string();
        let err = verifier(rpc, Network::Mainnet)
            .verify_transfer(&q)
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_missing_transaction_is_not_found() {
        let hash = tx_hash(0x36);
        let rpc = MockRpc::new(Address::ZERO);
        let err = verifier(rpc, Network::Mainnet)
            .verify_transfer(&query("mainnet", "ETH", hash))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::TransactionNotFound(h) if h == hash));
    }

    #[tokio::test]
    async fn test_missing_receipt_is_not_found() {
        let hash = tx_hash(0x37);
        let rpc = MockRpc::new(Address::ZERO);
        let err = verifier(rpc, Network::Mainnet)
            .verify_transfer(&query("mainnet", "USDC", hash))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::TransactionNotFound(h) if h == hash));
    }
}
