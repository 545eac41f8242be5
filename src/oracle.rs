//! Price oracle adapter.
//!
//! [`PriceFeed`] is the seam the converter prices against; [`ChainlinkFeed`]
//! is the production implementation reading a Chainlink `AggregatorV3`
//! aggregator. Every call re-queries the feed: purchase amounts are compared
//! in real time, so freshness wins over efficiency.

use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use rust_decimal::Decimal;
use tracing::instrument;

use crate::chain::{ChainRpc, RpcFailure};
use crate::contracts::IAggregatorV3;

/// Fixed-point scale of the aggregator's `answer` field.
const ANSWER_DECIMALS: u32 = 8;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The feed read failed at the transport or node level, or returned no data.
    #[error("price feed unavailable: {0}")]
    Unavailable(#[from] RpcFailure),
    /// The feed answered, but with something that cannot price a purchase.
    #[error("price feed returned an unusable answer: {0}")]
    Malformed(String),
}

/// Source of the native-asset/USD spot price.
pub trait PriceFeed: Send + Sync {
    /// Latest spot price in USD per whole native-asset unit. Always positive.
    fn latest_price_usd(&self) -> impl Future<Output = Result<Decimal, OracleError>> + Send;
}

/// Chainlink `AggregatorV3Interface` adapter over a [`ChainRpc`] client.
#[derive(Debug, Clone)]
pub struct ChainlinkFeed<C> {
    rpc: C,
    feed: Address,
}

impl<C> ChainlinkFeed<C> {
    pub fn new(rpc: C, feed: Address) -> Self {
        ChainlinkFeed { rpc, feed }
    }
}

impl<C: ChainRpc> PriceFeed for ChainlinkFeed<C> {
    #[instrument(skip_all, err, fields(feed = %self.feed))]
    async fn latest_price_usd(&self) -> Result<Decimal, OracleError> {
        let calldata = IAggregatorV3::latestRoundDataCall {}.abi_encode();
        let raw = self.rpc.call(self.feed, calldata.into()).await?;
        if raw.is_empty() {
            return Err(OracleError::Unavailable(RpcFailure::Other(
                format!("price feed {} returned no data", self.feed),
            )));
        }
        let round = IAggregatorV3::latestRoundDataCall::abi_decode_returns(&raw)
            .map_err(|e| OracleError::Malformed(e.to_string()))?;
        let answer: i128 = round
            .answer
            .try_into()
            .map_err(|_| OracleError::Malformed(format!("answer out of range: {}", round.answer)))?;
        if answer <= 0 {
            return Err(OracleError::Malformed(format!(
                "non-positive answer: {answer}"
            )));
        }
        let price = Decimal::from_i128_with_scale(answer, ANSWER_DECIMALS);
        tracing::debug!(%price, "Fetched spot price");
        Ok(price)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockRpc;
    use alloy_primitives::aliases::U80;
    use alloy_primitives::{I256, U256, address};
    use alloy_sol_types::SolValue;
    use rust_decimal::prelude::FromPrimitive;

    const FEED: Address = address!("0x4aDC67696bA383F43DD60A9e78F2C97Fbbfc7cb1");

    fn round_data(answer: i64) -> Vec<u8> {
        (
            U80::from(1u8),
            I256::try_from(answer).unwrap(),
            U256::from(1_700_000_000u64),
            U256::from(1_700_000_000u64),
            U80::from(1u8),
        )
            .abi_encode()
    }

    #[tokio::test]
    async fn test_scales_answer_from_fixed_point() {
        let rpc = MockRpc::new(Address::ZERO).on_read(
            FEED,
            IAggregatorV3::latestRoundDataCall::SELECTOR,
            round_data(300_000_000_000), // $3000.00 at 8 decimals
        );
        let feed = ChainlinkFeed::new(rpc, FEED);
        let price = feed.latest_price_usd().await.unwrap();
        assert_eq!(price, Decimal::from_f64(3000.0).unwrap());
    }

    #[tokio::test]
    async fn test_non_positive_answer_is_malformed() {
        let rpc = MockRpc::new(Address::ZERO).on_read(
            FEED,
            IAggregatorV3::latestRoundDataCall::SELECTOR,
            round_data(0),
        );
        let feed = ChainlinkFeed::new(rpc, FEED);
        assert!(matches!(
            feed.latest_price_usd().await,
            Err(OracleError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_response_is_unavailable() {
        let rpc = MockRpc::new(Address::ZERO).on_read(
            FEED,
            IAggregatorV3::latestRoundDataCall::SELECTOR,
            Vec::new(),
        );
        let feed = ChainlinkFeed::new(rpc, FEED);
        assert!(matches!(
            feed.latest_price_usd().await,
            Err(OracleError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_read_failure_is_unavailable() {
        // No read scripted for the feed address at all.
        let rpc = MockRpc::new(Address::ZERO);
        let feed = ChainlinkFeed::new(rpc, FEED);
        assert!(matches!(
            feed.latest_price_usd().await,
            Err(OracleError::Unavailable(_))
        ));
    }
}
