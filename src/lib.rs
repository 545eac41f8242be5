//! On-chain settlement and provisioning for pay-per-use eSIM data bundles.
//!
//! This crate covers the two halves of a connectivity product whose purchases
//! settle on-chain:
//!
//! - **Transfer verification** — given a transaction reference, a chain
//!   selector, an asset selector, and a vault address, determine how much of
//!   that asset the transaction actually delivered to the vault, across
//!   multiple EVM networks and both native-coin and ERC-20 transfer paths.
//!   See [`verify::TransferVerifier`].
//!
//! - **Provisioning** — drive the finality-gated workflow that turns a device
//!   wallet into a purchased data bundle: registration, eSIM-wallet
//!   deployment, identifier binding, and the purchase itself, each step
//!   consuming data emitted by the previous one. See
//!   [`provision::Orchestrator`].
//!
//! Both halves sit on the same seams: [`chain::ChainRpc`] for per-network
//! JSON-RPC access (production implementation: [`chain::Eip155Provider`] on
//! the Alloy stack), [`oracle::PriceFeed`] for the native/USD spot price, and
//! [`convert::CurrencyConverter`] for decimal-safe USD ↔ smallest-unit
//! arithmetic.
//!
//! # Modules
//!
//! - [`chain`] — Chain client trait, shared chain types, and the Alloy-backed provider.
//! - [`config`] — Typed configuration loaded once at startup; no singletons, no env reads.
//! - [`contracts`] — ABI declarations for the factory, wallets, price feed, and ERC-20 events.
//! - [`convert`] — USD ↔ native-asset conversion on arbitrary-precision decimals.
//! - [`network`] — Exhaustive registry of supported networks.
//! - [`oracle`] — Price feed trait and the Chainlink aggregator adapter.
//! - [`provision`] — The provisioning session state machine and orchestrator.
//! - [`tokens`] — Known token deployments and decimal-resolution policies.
//! - [`util`] — Money parsing and other shared helpers.
//! - [`verify`] — The cross-chain, cross-asset transfer verifier.
//!
//! Independent sessions and verification queries share no mutable state and
//! may be driven concurrently; within one session the workflow is strictly
//! sequential.

pub mod chain;
pub mod config;
pub mod contracts;
pub mod convert;
pub mod network;
pub mod oracle;
pub mod provision;
pub mod tokens;
pub mod util;
pub mod verify;
