//! Chain access.
//!
//! Defines the `ChainClient` trait the engine talks to, plus the pieces
//! needed to speak to an EVM node without a full SDK:
//! - `abi` — selectors and word encoding for the handful of calls we make
//! - `tx` — legacy EIP-155 transaction building, signing, and the operator account
//! - `rpc` — JSON-RPC over HTTP implementation of `ChainClient`

pub mod abi;
pub mod rpc;
pub mod tx;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use crate::types::Receipt;

/// Failures from the node transport or the JSON-RPC layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("node returned HTTP {0}")]
    Status(u16),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("failed to decode {field}: {message}")]
    Decode { field: String, message: String },

    #[error("timed out after {0}ms waiting for receipt")]
    Timeout(u64),
}

/// Abstraction over an EVM node.
///
/// Every method performs network I/O. Nothing here retries or deduplicates;
/// a re-broadcast of an already known transaction is rejected by the node.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Execute a read-only contract call against the latest block.
    async fn call_view(&self, contract: Address, calldata: Bytes) -> Result<Bytes, RpcError>;

    /// Next nonce for `address`, counting pending transactions.
    async fn transaction_count(&self, address: Address) -> Result<u64, RpcError>;

    /// The node's suggested gas price in wei.
    async fn gas_price(&self) -> Result<U256, RpcError>;

    async fn chain_id(&self) -> Result<u64, RpcError>;

    /// Submit a signed raw transaction, returning its hash.
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, RpcError>;

    /// Wait until `hash` is mined (or the client's receipt timeout elapses).
    async fn wait_for_receipt(&self, hash: B256) -> Result<Receipt, RpcError>;
}
