//! Agent context.
//!
//! One explicitly constructed object carries the chain client, the operator
//! account, the staking target and the only state that outlives a cycle:
//! the memoized token address and the count of unconfirmed stakes.

use alloy_primitives::Address;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::chain::tx::Account;
use crate::chain::ChainClient;
use crate::types::TokenUnits;

/// Per-process settings the engine reads each cycle.
#[derive(Debug, Clone)]
pub struct StakingParams {
    pub gas_limit: u64,
    pub allow_overlapping_stakes: bool,
    pub pool_table: bool,
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            gas_limit: 200_000,
            allow_overlapping_stakes: false,
            pool_table: true,
        }
    }
}

pub struct AgentContext {
    pub client: Arc<dyn ChainClient>,
    pub account: Account,
    pub staking_contract: Address,
    pub units: TokenUnits,
    pub params: StakingParams,
    token_address: OnceCell<Address>,
    pending: Arc<AtomicUsize>,
}

impl AgentContext {
    pub fn new(
        client: Arc<dyn ChainClient>,
        account: Account,
        staking_contract: Address,
        units: TokenUnits,
        params: StakingParams,
    ) -> Self {
        Self {
            client,
            account,
            staking_contract,
            units,
            params,
            token_address: OnceCell::new(),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn token_cache(&self) -> &OnceCell<Address> {
        &self.token_address
    }

    /// Cached token address, if it has been resolved.
    pub fn cached_token_address(&self) -> Option<Address> {
        self.token_address.get().copied()
    }

    /// Stakes broadcast but not yet confirmed or failed.
    pub fn pending_confirmations(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Mark a stake as in flight. The returned guard clears the mark when
    /// dropped, which the confirmation watcher does once it has an outcome.
    pub(crate) fn track_pending(&self) -> PendingGuard {
        self.pending.fetch_add(1, Ordering::SeqCst);
        PendingGuard {
            pending: Arc::clone(&self.pending),
        }
    }
}

pub(crate) struct PendingGuard {
    pending: Arc<AtomicUsize>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}
