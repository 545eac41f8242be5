//! Alloy-backed chain client.
//!
//! One [`Eip155Provider`] per configured network, built from
//! [`ChainSettings`](crate::config::ChainSettings) and an explicit signing
//! credential. The provider composes the usual filler stack for gas, blob
//! gas, nonce, and chain ID around a [`RootProvider`] over HTTP.

use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, B256, Bytes};
use alloy_provider::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
};
use alloy_provider::{Identity, Provider, ProviderBuilder, RootProvider};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::{Filter, TransactionRequest, TransactionTrait};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport_http::Http;
use std::time::Duration;

use crate::chain::{ChainRpc, ConfirmedReceipt, MutationCall, RpcFailure, TransactionSummary};
use crate::config::ChainSettings;
use crate::network::Network;

/// Combined filler type for gas, blob gas, nonce, and chain ID.
pub type InnerFiller =
    JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>;

/// The fully composed provider type: filler stack plus wallet signing around
/// a [`RootProvider`] doing the actual JSON-RPC communication.
pub type InnerProvider = FillProvider<
    JoinFill<JoinFill<Identity, InnerFiller>, WalletFiller<EthereumWallet>>,
    RootProvider,
>;

/// Provider for a single EVM-compatible network.
#[derive(Debug)]
pub struct Eip155Provider {
    network: Network,
    inner: InnerProvider,
    signer_address: Address,
    receipt_timeout: Duration,
}

impl Eip155Provider {
    /// Connect to the network's RPC endpoint with the given signing credential.
    ///
    /// The signer is pinned to the network's chain ID so mutations cannot be
    /// replayed across chains.
    pub fn connect(network: Network, settings: &ChainSettings, signer: PrivateKeySigner) -> Self {
        let signer = signer.with_chain_id(Some(network.chain_id()));
        let signer_address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let client = RpcClient::new(Http::new(settings.rpc.clone()), false);
        let filler = JoinFill::new(
            GasFiller,
            JoinFill::new(
                BlobGasFiller::default(),
                JoinFill::new(NonceFiller::default(), ChainIdFiller::default()),
            ),
        );
        let inner: InnerProvider = ProviderBuilder::default()
            .filler(filler)
            .wallet(wallet)
            .connect_client(client);

        tracing::info!(network = %network, rpc = %settings.rpc, signer = %signer_address, "Connected EVM provider");

        Eip155Provider {
            network,
            inner,
            signer_address,
            receipt_timeout: Duration::from_secs(settings.receipt_timeout_secs),
        }
    }

    /// Network this provider talks to.
    pub fn network(&self) -> Network {
        self.network
    }

    fn confirmed(receipt: alloy_rpc_types_eth::TransactionReceipt) -> ConfirmedReceipt {
        ConfirmedReceipt {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number.unwrap_or_default(),
            status: receipt.status(),
            logs: receipt.inner.logs().to_vec(),
        }
    }
}

impl ChainRpc for Eip155Provider {
    fn caller_address(&self) -> Address {
        self.signer_address
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, RpcFailure> {
        let request = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata);
        let returned = self.inner.call(request).await?;
        Ok(returned)
    }

    async fn submit(&self, mutation: MutationCall) -> Result<ConfirmedReceipt, RpcFailure> {
        let request = TransactionRequest::default()
            .with_from(self.signer_address)
            .with_to(mutation.to)
            .with_input(mutation.calldata)
            .with_value(mutation.value);

        let pending = self.inner.send_transaction(request).await?;
        let transaction_hash = *pending.tx_hash();
        tracing::info!(
            network = %self.network,
            tx = %transaction_hash,
            confirmations = mutation.confirmations,
            "Submitted mutation, waiting for confirmations"
        );

        let receipt = pending
            .with_required_confirmations(mutation.confirmations)
            .with_timeout(Some(self.receipt_timeout))
            .get_receipt()
            .await?;
        Ok(Self::confirmed(receipt))
    }

    async fn transaction_by_hash(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionSummary>, RpcFailure> {
        let transaction = self.inner.get_transaction_by_hash(hash).await?;
        Ok(transaction.map(|tx| TransactionSummary {
            to: tx.to(),
            value: tx.value(),
        }))
    }

    async fn receipt_by_hash(&self, hash: B256) -> Result<Option<ConfirmedReceipt>, RpcFailure> {
        let receipt = self.inner.get_transaction_receipt(hash).await?;
        Ok(receipt.map(Self::confirmed))
    }

    async fn logs_in_range(
        &self,
        address: Address,
        event_signature: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<alloy_rpc_types_eth::Log>, RpcFailure> {
        let filter = Filter::new()
            .address(address)
            .event_signature(event_signature)
            .from_block(from_block)
            .to_block(to_block);
        Ok(self.inner.get_logs(&filter).await?)
    }
}
