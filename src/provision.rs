//! Finality-gated provisioning workflow.
//!
//! [`Orchestrator`] drives a fixed sequence of contract mutations per
//! [`ProvisioningSession`]: registration, eSIM-wallet deployment, identifier
//! binding, bundle purchase. Each step waits for the configured confirmation
//! depth before the next one consumes its outputs, and every authorization
//! check runs before anything irreversible is submitted. Steps never retry on
//! their own; a failed session stays at its last completed state and can be
//! resumed by the host after reconciliation.

use alloy_primitives::{Address, B256, U256, keccak256};
use alloy_sol_types::{SolCall, SolEvent};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::instrument;

use crate::chain::{ChainRpc, ConfirmedReceipt, MutationCall, RpcFailure};
use crate::contracts::{IDeviceWallet, IDeviceWalletFactory, IESIMWallet};
use crate::convert::CurrencyConverter;
use crate::oracle::{OracleError, PriceFeed};
use crate::util::money::UsdAmount;

/// Workflow position of a session. Only ever advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unregistered,
    Registered,
    WalletDeployed,
    IdentifierBound,
    BundlePurchased,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unregistered => write!(f, "unregistered"),
            SessionState::Registered => write!(f, "registered"),
            SessionState::WalletDeployed => write!(f, "wallet_deployed"),
            SessionState::IdentifierBound => write!(f, "identifier_bound"),
            SessionState::BundlePurchased => write!(f, "bundle_purchased"),
        }
    }
}

/// One provisioning attempt for one device wallet.
///
/// Plain serializable value: the host persists it between steps to resume
/// after a crash or timeout without re-deriving which on-chain steps already
/// completed. The core never stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningSession {
    pub device_wallet: Address,
    /// Resolved during wallet deployment.
    pub esim_wallet: Option<Address>,
    pub esim_identifier: String,
    pub bundle_id: String,
    pub price_usd: UsdAmount,
    pub state: SessionState,
}

impl ProvisioningSession {
    pub fn new(
        device_wallet: Address,
        esim_identifier: impl Into<String>,
        bundle_id: impl Into<String>,
        price_usd: UsdAmount,
    ) -> Self {
        ProvisioningSession {
            device_wallet,
            esim_wallet: None,
            esim_identifier: esim_identifier.into(),
            bundle_id: bundle_id.into(),
            price_usd,
            state: SessionState::Unregistered,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Unauthorized caller {caller}: eSIM wallet admin is {admin}")]
    UnauthorizedCaller { caller: Address, admin: Address },
    #[error("Unknown eSIM wallet {esim_wallet}: not associated with device wallet {device_wallet}")]
    UnknownEsimWallet {
        device_wallet: Address,
        esim_wallet: Address,
    },
    #[error("eSIM wallet deployment resolved no wallet address (tx {transaction})")]
    DeploymentFailed { transaction: B256 },
    #[error("Step requires session state {expected}, found {found}")]
    StepOutOfOrder {
        expected: SessionState,
        found: SessionState,
    },
    #[error("Mutation {transaction} reverted on-chain")]
    Reverted { transaction: B256 },
    #[error("Contract returned undecodable data: {0}")]
    AbiDecode(#[from] alloy_sol_types::Error),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Rpc(#[from] RpcFailure),
}

/// Produces the uniqueness salt for an eSIM-wallet deployment.
///
/// Two deployments against the same device wallet must never see the same
/// salt; the strategy owns that guarantee so callers cannot forget it.
pub trait SaltStrategy: Send + Sync {
    fn next_salt(&self, device_wallet: Address, esim_identifier: &str) -> U256;
}

/// Deterministic keccak-256 derivation over a deployment prefix, the device
/// wallet, the eSIM identifier, and a nanosecond timestamp.
#[derive(Debug, Clone)]
pub struct DerivedSalt {
    prefix: String,
}

impl DerivedSalt {
    pub fn new(prefix: impl Into<String>) -> Self {
        DerivedSalt {
            prefix: prefix.into(),
        }
    }
}

impl SaltStrategy for DerivedSalt {
    fn next_salt(&self, device_wallet: Address, esim_identifier: &str) -> U256 {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let mut preimage = Vec::with_capacity(
            self.prefix.len() + Address::len_bytes() + esim_identifier.len() + 16,
        );
        preimage.extend_from_slice(self.prefix.as_bytes());
        preimage.extend_from_slice(device_wallet.as_slice());
        preimage.extend_from_slice(esim_identifier.as_bytes());
        preimage.extend_from_slice(&nanos.to_be_bytes());
        U256::from_be_bytes(keccak256(&preimage).0)
    }
}

/// Fixed salt for hosts that manage uniqueness themselves.
#[derive(Debug, Clone, Copy)]
pub struct FixedSalt(pub U256);

impl SaltStrategy for FixedSalt {
    fn next_salt(&self, _device_wallet: Address, _esim_identifier: &str) -> U256 {
        self.0
    }
}

/// Drives the provisioning workflow against one network's contracts.
pub struct Orchestrator<C, F, S = DerivedSalt> {
    rpc: C,
    factory: Address,
    converter: CurrencyConverter<F>,
    salts: S,
    confirmations: u64,
}

impl<C, F, S> Orchestrator<C, F, S> {
    pub fn new(
        rpc: C,
        factory: Address,
        converter: CurrencyConverter<F>,
        salts: S,
        confirmations: u64,
    ) -> Self {
        Orchestrator {
            rpc,
            factory,
            converter,
            salts,
            confirmations,
        }
    }
}

impl<C, F, S> Orchestrator<C, F, S>
where
    C: ChainRpc,
    F: PriceFeed,
    S: SaltStrategy,
{
    async fn read<Call: SolCall>(
        &self,
        to: Address,
        call: Call,
    ) -> Result<Call::Return, ProvisionError> {
        let raw = self.rpc.call(to, call.abi_encode().into()).await?;
        Ok(Call::abi_decode_returns(&raw)?)
    }

    async fn mutate(
        &self,
        to: Address,
        calldata: Vec<u8>,
        value: U256,
    ) -> Result<ConfirmedReceipt, ProvisionError> {
        let receipt = self
            .rpc
            .submit(MutationCall {
                to,
                calldata: calldata.into(),
                value,
                confirmations: self.confirmations,
            })
            .await?;
        if !receipt.status {
            return Err(ProvisionError::Reverted {
                transaction: receipt.transaction_hash,
            });
        }
        Ok(receipt)
    }

    fn expect_state(
        session: &ProvisioningSession,
        expected: SessionState,
    ) -> Result<(), ProvisionError> {
        if session.state == expected {
            Ok(())
        } else {
            Err(ProvisionError::StepOutOfOrder {
                expected,
                found: session.state,
            })
        }
    }

    fn resolved_wallet(session: &ProvisioningSession) -> Result<Address, ProvisionError> {
        session
            .esim_wallet
            .ok_or(ProvisionError::StepOutOfOrder {
                expected: SessionState::WalletDeployed,
                found: session.state,
            })
    }

    /// Make sure the device wallet is registered with the factory, submitting
    /// the registration mutation only when the on-chain flag reads false.
    #[instrument(skip_all, err, fields(device_wallet = %session.device_wallet))]
    pub async fn ensure_registered(
        &self,
        session: &mut ProvisioningSession,
    ) -> Result<(), ProvisionError> {
        Self::expect_state(session, SessionState::Unregistered)?;
        let registered = self
            .read(
                self.factory,
                IDeviceWalletFactory::deviceWalletInfoAddedCall {
                    deviceWallet: session.device_wallet,
                },
            )
            .await?;
        if registered {
            tracing::info!("Device wallet already registered, skipping");
            session.state = SessionState::Registered;
            return Ok(());
        }

        let identifier = self
            .read(session.device_wallet, IDeviceWallet::deviceUniqueIdentifierCall {})
            .await?;
        let owner_x = self
            .read(session.device_wallet, IDeviceWallet::ownerCall { index: U256::ZERO })
            .await?;
        let owner_y = self
            .read(
                session.device_wallet,
                IDeviceWallet::ownerCall {
                    index: U256::from(1u8),
                },
            )
            .await?;

        let calldata = IDeviceWalletFactory::postCreateAccountCall {
            deviceWallet: session.device_wallet,
            deviceUniqueIdentifier: identifier,
            deviceWalletOwnerKey: [owner_x, owner_y],
        }
        .abi_encode();
        let receipt = self.mutate(self.factory, calldata, U256::ZERO).await?;
        tracing::info!(tx = %receipt.transaction_hash, "Device wallet registered");
        session.state = SessionState::Registered;
        Ok(())
    }

    /// Deploy the eSIM wallet and resolve its address from the deployment
    /// event. Fails before submission unless the signer is the factory admin.
    #[instrument(skip_all, err, fields(device_wallet = %session.device_wallet))]
    pub async fn deploy_wallet(
        &self,
        session: &mut ProvisioningSession,
    ) -> Result<Address, ProvisionError> {
        Self::expect_state(session, SessionState::Registered)?;

        let admin = self
            .read(self.factory, IDeviceWalletFactory::eSIMWalletAdminCall {})
            .await?;
        let caller = self.rpc.caller_address();
        if caller != admin {
            return Err(ProvisionError::UnauthorizedCaller { caller, admin });
        }

        let salt = self
            .salts
            .next_salt(session.device_wallet, &session.esim_identifier);
        let calldata = IDeviceWallet::deployESIMWalletCall {
            hasAccessToETH: true,
            salt,
        }
        .abi_encode();
        let receipt = self.mutate(session.device_wallet, calldata, U256::ZERO).await?;

        let esim_wallet = self
            .deployed_wallet_in_block(session.device_wallet, receipt.block_number)
            .await?;
        if esim_wallet.is_zero() {
            return Err(ProvisionError::DeploymentFailed {
                transaction: receipt.transaction_hash,
            });
        }
        tracing::info!(tx = %receipt.transaction_hash, esim_wallet = %esim_wallet, "eSIM wallet deployed");
        session.esim_wallet = Some(esim_wallet);
        session.state = SessionState::WalletDeployed;
        Ok(esim_wallet)
    }

    /// Scan one block for the wallet-deployment event. The zero address is
    /// the sentinel for "no event found"; the low-level query succeeding with
    /// an empty result is not an RPC error.
    async fn deployed_wallet_in_block(
        &self,
        device_wallet: Address,
        block: u64,
    ) -> Result<Address, ProvisionError> {
        let logs = self
            .rpc
            .logs_in_range(
                device_wallet,
                IDeviceWallet::ESIMWalletAdded::SIGNATURE_HASH,
                block,
                block,
            )
            .await?;
        for log in &logs {
            if let Ok(decoded) = log.log_decode::<IDeviceWallet::ESIMWalletAdded>() {
                let added = decoded.inner;
                tracing::info!(
                    esim_wallet = %added.eSIMWalletAddress,
                    has_eth_access = added.hasAccessToETH,
                    added_by = %added.caller,
                    "Observed wallet-deployment event"
                );
                return Ok(added.eSIMWalletAddress);
            }
        }
        Ok(Address::ZERO)
    }

    /// Bind the session's eSIM unique identifier to the deployed wallet.
    #[instrument(skip_all, err, fields(device_wallet = %session.device_wallet))]
    pub async fn bind_identifier(
        &self,
        session: &mut ProvisioningSession,
    ) -> Result<(), ProvisionError> {
        Self::expect_state(session, SessionState::WalletDeployed)?;
        let esim_wallet = Self::resolved_wallet(session)?;

        let calldata = IDeviceWallet::setESIMUniqueIdentifierForAnESIMWalletCall {
            eSIMWallet: esim_wallet,
            eSIMUniqueIdentifier: session.esim_identifier.clone(),
        }
        .abi_encode();
        let receipt = self.mutate(session.device_wallet, calldata, U256::ZERO).await?;
        tracing::info!(tx = %receipt.transaction_hash, esim_wallet = %esim_wallet, "Identifier bound");
        session.state = SessionState::IdentifierBound;
        Ok(())
    }

    /// Buy the session's data bundle, paying its USD price in native units.
    /// Fails before any funds move if the eSIM wallet is not recognized by
    /// the device wallet.
    #[instrument(skip_all, err, fields(
        device_wallet = %session.device_wallet,
        bundle = %session.bundle_id,
    ))]
    pub async fn purchase(&self, session: &mut ProvisioningSession) -> Result<(), ProvisionError> {
        Self::expect_state(session, SessionState::IdentifierBound)?;
        let esim_wallet = Self::resolved_wallet(session)?;

        let valid = self
            .read(
                session.device_wallet,
                IDeviceWallet::isValidESIMWalletCall {
                    eSIMWallet: esim_wallet,
                },
            )
            .await?;
        if !valid {
            return Err(ProvisionError::UnknownEsimWallet {
                device_wallet: session.device_wallet,
                esim_wallet,
            });
        }

        let wei = self.converter.usd_to_wei(session.price_usd).await?;
        tracing::info!(price_usd = %session.price_usd, %wei, "Priced data bundle");

        let calldata = IESIMWallet::buyDataBundleCall {
            dataBundleDetail: IESIMWallet::DataBundleDetails {
                dataBundleID: session.bundle_id.clone(),
                dataBundlePrice: wei,
            },
        }
        .abi_encode();
        let receipt = self.mutate(esim_wallet, calldata, wei).await?;
        tracing::info!(tx = %receipt.transaction_hash, "Data bundle purchased");
        session.state = SessionState::BundlePurchased;
        Ok(())
    }

    /// Drive the remaining steps from the session's current state.
    pub async fn run(&self, session: &mut ProvisioningSession) -> Result<(), ProvisionError> {
        loop {
            match session.state {
                SessionState::Unregistered => self.ensure_registered(session).await?,
                SessionState::Registered => {
                    self.deploy_wallet(session).await?;
                }
                SessionState::WalletDeployed => self.bind_identifier(session).await?,
                SessionState::IdentifierBound => self.purchase(session).await?,
                SessionState::BundlePurchased => return Ok(()),
            }
        }
    }
}
