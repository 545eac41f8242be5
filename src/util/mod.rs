//! Utility types shared across the crate.

pub mod money;

pub use money::{UsdAmount, UsdAmountParseError};
