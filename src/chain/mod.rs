//! Chain client surface and shared chain types.
//!
//! [`ChainRpc`] is the seam between the core workflows and a concrete
//! JSON-RPC node: read-only contract calls, state-mutating calls that wait
//! for a confirmation depth, transaction and receipt lookups, and block-range
//! event queries. The production implementation lives in [`provider`]; the
//! verifier and orchestrator are generic over the trait so independent
//! sessions can share one client or hold their own.

pub mod provider;

use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_provider::PendingTransactionError;
use alloy_rpc_types_eth::Log;
use alloy_transport::TransportError;
use std::sync::Arc;

pub use provider::Eip155Provider;

/// Underlying transport or node error, opaque to the workflows above it.
#[derive(Debug, thiserror::Error)]
pub enum RpcFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Submission landed but the receipt wait failed or timed out. The
    /// mutation may still have been included; the caller must re-check chain
    /// state before retrying.
    #[error(transparent)]
    PendingTransaction(#[from] PendingTransactionError),
    #[error("{0}")]
    Other(String),
}

/// A state-mutating contract call: target, encoded calldata, attached
/// native-asset value, and the block depth to wait for before trusting it.
#[derive(Debug, Clone)]
pub struct MutationCall {
    /// Target contract address.
    pub to: Address,
    /// Encoded function call.
    pub calldata: Bytes,
    /// Native-asset payment attached to the call, in smallest units.
    pub value: U256,
    /// Number of block confirmations to wait for.
    pub confirmations: u64,
}

/// A mutation's receipt after the required confirmation depth was reached.
#[derive(Debug, Clone)]
pub struct ConfirmedReceipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    /// Execution status: `false` means the transaction reverted.
    pub status: bool,
    pub logs: Vec<Log>,
}

/// The fields of a fetched transaction the verifier cares about.
#[derive(Debug, Clone, Copy)]
pub struct TransactionSummary {
    /// Direct recipient, absent for contract creations.
    pub to: Option<Address>,
    /// Native-asset value carried by the transaction, in smallest units.
    pub value: U256,
}

/// Per-chain JSON-RPC client surface.
///
/// Implementations must be safe for concurrent use; the core holds no other
/// shared state across sessions.
pub trait ChainRpc: Send + Sync {
    /// Address the client signs mutations with.
    fn caller_address(&self) -> Address;

    /// Read-only contract call.
    fn call(
        &self,
        to: Address,
        calldata: Bytes,
    ) -> impl Future<Output = Result<Bytes, RpcFailure>> + Send;

    /// Submit a mutation and wait until it is included at the requested
    /// confirmation depth. Can suspend for an unbounded time; the production
    /// implementation applies a configurable client-side timeout whose expiry
    /// surfaces as a recoverable [`RpcFailure`].
    fn submit(
        &self,
        mutation: MutationCall,
    ) -> impl Future<Output = Result<ConfirmedReceipt, RpcFailure>> + Send;

    /// Fetch a transaction by hash. `None` when the node does not know it.
    fn transaction_by_hash(
        &self,
        hash: B256,
    ) -> impl Future<Output = Result<Option<TransactionSummary>, RpcFailure>> + Send;

    /// Fetch a transaction receipt by hash. `None` when not yet mined or unknown.
    fn receipt_by_hash(
        &self,
        hash: B256,
    ) -> impl Future<Output = Result<Option<ConfirmedReceipt>, RpcFailure>> + Send;

    /// Query logs emitted by `address` matching `event_signature` over an
    /// inclusive block range.
    fn logs_in_range(
        &self,
        address: Address,
        event_signature: B256,
        from_block: u64,
        to_block: u64,
    ) -> impl Future<Output = Result<Vec<Log>, RpcFailure>> + Send;
}

impl<T: ChainRpc> ChainRpc for Arc<T> {
    fn caller_address(&self) -> Address {
        (**self).caller_address()
    }

    fn call(
        &self,
        to: Address,
        calldata: Bytes,
    ) -> impl Future<Output = Result<Bytes, RpcFailure>> + Send {
        (**self).call(to, calldata)
    }

    fn submit(
        &self,
        mutation: MutationCall,
    ) -> impl Future<Output = Result<ConfirmedReceipt, RpcFailure>> + Send {
        (**self).submit(mutation)
    }

    fn transaction_by_hash(
        &self,
        hash: B256,
    ) -> impl Future<Output = Result<Option<TransactionSummary>, RpcFailure>> + Send {
        (**self).transaction_by_hash(hash)
    }

    fn receipt_by_hash(
        &self,
        hash: B256,
    ) -> impl Future<Output = Result<Option<ConfirmedReceipt>, RpcFailure>> + Send {
        (**self).receipt_by_hash(hash)
    }

    fn logs_in_range(
        &self,
        address: Address,
        event_signature: B256,
        from_block: u64,
        to_block: u64,
    ) -> impl Future<Output = Result<Vec<Log>, RpcFailure>> + Send {
        (**self).logs_in_range(address, event_signature, from_block, to_block)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use alloy_primitives::LogData;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Scripted [`ChainRpc`] for unit tests: reads are keyed by target address
    /// and function selector, submissions are recorded and answered from a
    /// queue of prepared receipts.
    pub(crate) struct MockRpc {
        caller: Address,
        reads: HashMap<(Address, [u8; 4]), Bytes>,
        transactions: HashMap<B256, TransactionSummary>,
        receipts: HashMap<B256, ConfirmedReceipt>,
        logs: Vec<Log>,
        submit_receipts: Mutex<VecDeque<ConfirmedReceipt>>,
        submitted: Mutex<Vec<MutationCall>>,
    }

    impl MockRpc {
        pub(crate) fn new(caller: Address) -> Self {
            MockRpc {
                caller,
                reads: HashMap::new(),
                transactions: HashMap::new(),
                receipts: HashMap::new(),
                logs: Vec::new(),
                submit_receipts: Mutex::new(VecDeque::new()),
                submitted: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn on_read(mut self, to: Address, selector: [u8; 4], returns: Vec<u8>) -> Self {
            self.reads.insert((to, selector), returns.into());
            self
        }

        pub(crate) fn with_transaction(mut self, hash: B256, summary: TransactionSummary) -> Self {
            self.transactions.insert(hash, summary);
            self
        }

        pub(crate) fn with_receipt(mut self, hash: B256, receipt: ConfirmedReceipt) -> Self {
            self.receipts.insert(hash, receipt);
            self
        }

        pub(crate) fn with_log(mut self, emitter: Address, block: u64, data: LogData) -> Self {
            self.logs.push(log_at(emitter, block, data));
            self
        }

        /// Queue the receipt answered by the next unanswered `submit`.
        pub(crate) fn on_submit(self, receipt: ConfirmedReceipt) -> Self {
            self.submit_receipts.lock().unwrap().push_back(receipt);
            self
        }

        pub(crate) fn submitted(&self) -> Vec<MutationCall> {
            self.submitted.lock().unwrap().clone()
        }
    }

    impl ChainRpc for MockRpc {
        fn caller_address(&self) -> Address {
            self.caller
        }

        async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, RpcFailure> {
            let selector: [u8; 4] = calldata
                .get(..4)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| RpcFailure::Other("calldata shorter than a selector".into()))?;
            self.reads
                .get(&(to, selector))
                .cloned()
                .ok_or_else(|| RpcFailure::Other(format!("unexpected read {to}/{selector:02x?}")))
        }

        async fn submit(&self, mutation: MutationCall) -> Result<ConfirmedReceipt, RpcFailure> {
            self.submitted.lock().unwrap().push(mutation);
            let receipt = self.submit_receipts.lock().unwrap().pop_front();
            Ok(receipt.unwrap_or(ConfirmedReceipt {
                transaction_hash: B256::repeat_byte(0xAA),
                block_number: 1,
                status: true,
                logs: Vec::new(),
            }))
        }

        async fn transaction_by_hash(
            &self,
            hash: B256,
        ) -> Result<Option<TransactionSummary>, RpcFailure> {
            Ok(self.transactions.get(&hash).copied())
        }

        async fn receipt_by_hash(&self, hash: B256) -> Result<Option<ConfirmedReceipt>, RpcFailure> {
            Ok(self.receipts.get(&hash).cloned())
        }

        async fn logs_in_range(
            &self,
            address: Address,
            event_signature: B256,
            from_block: u64,
            to_block: u64,
        ) -> Result<Vec<Log>, RpcFailure> {
            Ok(self
                .logs
                .iter()
                .filter(|log| {
                    log.inner.address == address
                        && log
                            .block_number
                            .is_some_and(|block| (from_block..=to_block).contains(&block))
                        && log.inner.data.topics().first() == Some(&event_signature)
                })
                .cloned()
                .collect())
        }
    }

    /// Build a full RPC log around raw event data.
    pub(crate) fn log_at(emitter: Address, block: u64, data: LogData) -> Log {
        Log {
            inner: alloy_primitives::Log {
                address: emitter,
                data,
            },
            block_hash: None,
            block_number: Some(block),
            block_timestamp: None,
            transaction_hash: None,
            transaction_index: None,
            log_index: None,
            removed: false,
        }
    }
}
