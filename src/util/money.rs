use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

/// A bundle price in USD, in human-readable currency format.
/// Accepts strings like "$10", "26.5", "1,000", or raw numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsdAmount(pub Decimal);

#[derive(Debug, thiserror::Error)]
pub enum UsdAmountParseError {
    #[error("Invalid number format")]
    InvalidFormat,
    #[error(
        "Amount must be between {} and {}",
        usd_amount::MIN_STR,
        usd_amount::MAX_STR
    )]
    OutOfRange,
    #[error("Negative value is not allowed")]
    Negative,
}

mod usd_amount {
    use super::*;

    pub const MIN_STR: &str = "0.000000001";
    pub const MAX_STR: &str = "999999999";

    pub static MIN: Lazy<Decimal> = Lazy::new(|| Decimal::from_str(MIN_STR).expect("valid decimal"));
    pub static MAX: Lazy<Decimal> = Lazy::new(|| Decimal::from_str(MAX_STR).expect("valid decimal"));

    /// Strips anything that isn't a digit, dot, or minus.
    pub static CLEANER: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"[^\d\.\-]+").expect("valid regex"));
}

impl UsdAmount {
    pub fn parse(input: &str) -> Result<Self, UsdAmountParseError> {
        let cleaned = usd_amount::CLEANER.replace_all(input, "").to_string();

        let parsed =
            Decimal::from_str(&cleaned).map_err(|_| UsdAmountParseError::InvalidFormat)?;

        if parsed.is_sign_negative() {
            return Err(UsdAmountParseError::Negative);
        }

        if parsed < *usd_amount::MIN || parsed > *usd_amount::MAX {
            return Err(UsdAmountParseError::OutOfRange);
        }

        Ok(UsdAmount(parsed))
    }
}

impl FromStr for UsdAmount {
    type Err = UsdAmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UsdAmount::parse(s)
    }
}

impl TryFrom<&str> for UsdAmount {
    type Error = UsdAmountParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        UsdAmount::from_str(value)
    }
}

impl From<u128> for UsdAmount {
    fn from(value: u128) -> Self {
        UsdAmount(Decimal::from(value))
    }
}

impl TryFrom<f64> for UsdAmount {
    type Error = UsdAmountParseError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let decimal = Decimal::from_f64(value).ok_or(UsdAmountParseError::OutOfRange)?;
        if decimal.is_sign_negative() {
            return Err(UsdAmountParseError::Negative);
        }
        if decimal < *usd_amount::MIN || decimal > *usd_amount::MAX {
            return Err(UsdAmountParseError::OutOfRange);
        }
        Ok(UsdAmount(decimal))
    }
}

impl Display for UsdAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_dollar_prefix() {
        let amount = UsdAmount::parse("$10").unwrap();
        assert_eq!(amount.0, Decimal::from(10));
    }

    #[test]
    fn test_parses_decimals_and_separators() {
        assert_eq!(
            UsdAmount::parse("26.5").unwrap().0,
            Decimal::from_str("26.5").unwrap()
        );
        assert_eq!(UsdAmount::parse("1,000").unwrap().0, Decimal::from(1000));
    }

    #[test]
    fn test_rejects_negative_and_garbage() {
        assert!(matches!(
            UsdAmount::parse("-5"),
            Err(UsdAmountParseError::Negative)
        ));
        assert!(matches!(
            UsdAmount::parse("free"),
            Err(UsdAmountParseError::InvalidFormat)
        ));
        assert!(matches!(
            UsdAmount::parse("0.0000000000001"),
            Err(UsdAmountParseError::OutOfRange)
        ));
    }

    #[test]
    fn test_serde_transparent() {
        let amount: UsdAmount = serde_json::from_str("\"26.5\"").unwrap();
        assert_eq!(amount.0, Decimal::from_str("26.5").unwrap());
    }
}
