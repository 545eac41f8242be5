//! USD ↔ native-asset conversion.
//!
//! Pure arithmetic over [`rust_decimal::Decimal`] on top of a [`PriceFeed`].
//! The smallest-unit results become transacted monetary values, so the final
//! scaling never touches binary floating point: amounts are truncated to the
//! native asset's 18 decimal places and parsed into a [`U256`].

use alloy_primitives::U256;
use alloy_primitives::utils::{format_units, parse_units};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::oracle::{OracleError, PriceFeed};
use crate::util::money::UsdAmount;

/// Decimal precision of the native asset's smallest unit (wei).
pub const NATIVE_DECIMALS: u8 = 18;

/// Stateless USD ↔ native converter.
#[derive(Debug, Clone)]
pub struct CurrencyConverter<F> {
    feed: F,
}

impl<F> CurrencyConverter<F> {
    pub fn new(feed: F) -> Self {
        CurrencyConverter { feed }
    }
}

impl<F: PriceFeed> CurrencyConverter<F> {
    /// Latest spot price, straight from the feed.
    pub async fn spot_price_usd(&self) -> Result<Decimal, OracleError> {
        self.feed.latest_price_usd().await
    }

    /// Convert a USD amount into native smallest units at the current spot
    /// price. The quotient is truncated to 18 decimal places before scaling.
    pub async fn usd_to_wei(&self, usd: UsdAmount) -> Result<U256, OracleError> {
        let price = self.feed.latest_price_usd().await?;
        let native = (usd.0 / price)
            .round_dp_with_strategy(NATIVE_DECIMALS as u32, RoundingStrategy::ToZero);
        let wei = parse_units(&native.to_string(), NATIVE_DECIMALS)
            .map_err(|e| OracleError::Malformed(format!("cannot scale {native} to wei: {e}")))?
            .get_absolute();
        tracing::debug!(%usd, %price, %native, %wei, "Converted USD to native");
        Ok(wei)
    }

    /// Convert a native smallest-unit amount into USD at the current spot price.
    pub async fn wei_to_usd(&self, wei: U256) -> Result<UsdAmount, OracleError> {
        let price = self.feed.latest_price_usd().await?;
        let native = units_to_decimal(wei, NATIVE_DECIMALS).map_err(OracleError::Malformed)?;
        Ok(UsdAmount(native * price))
    }
}

/// Scale a smallest-unit integer into a human-readable decimal quantity.
pub(crate) fn units_to_decimal(raw: U256, decimals: u8) -> Result<Decimal, String> {
    let formatted = format_units(raw, decimals).map_err(|e| e.to_string())?;
    Decimal::from_str(&formatted).map_err(|e| format!("{formatted}: {e}"))
}
