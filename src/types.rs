//! Shared types for the staking agent.
//!
//! Pool snapshots, stake decisions, receipts, token unit conversion and the
//! error union every cycle resolves into.

use alloy_primitives::{B256, U256};
use rust_decimal::Decimal;
use std::fmt;

// ---------------------------------------------------------------------------
// Pool state
// ---------------------------------------------------------------------------

/// Values read from the staking and token contracts during one cycle.
///
/// All amounts are in the token's smallest unit. A snapshot is only ever
/// produced whole; see `engine::reader::read_snapshot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub is_open: bool,
    pub is_active: bool,
    pub max_pool_size: U256,
    pub total_principal: U256,
    /// Token balance held by the operator account.
    pub operator_balance: U256,
}

impl PoolSnapshot {
    /// Remaining pool capacity. Zero when principal exceeds the cap.
    pub fn available_space(&self) -> U256 {
        self.max_pool_size.saturating_sub(self.total_principal)
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Why a cycle decided not to stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    PoolClosed,
    PoolInactive,
    PoolFull,
    NoBalance,
    /// An earlier stake has not been confirmed yet.
    PendingConfirmation,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::PoolClosed => write!(f, "pool is not open"),
            SkipReason::PoolInactive => write!(f, "pool is not active"),
            SkipReason::PoolFull => write!(f, "no space left in pool"),
            SkipReason::NoBalance => write!(f, "no operator balance to stake"),
            SkipReason::PendingConfirmation => write!(f, "previous stake awaiting confirmation"),
        }
    }
}

/// Outcome of the decision engine for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeDecision {
    Skip(SkipReason),
    /// Stake this many smallest units.
    Stake { amount: U256 },
}

impl StakeDecision {
    pub fn is_skip(&self) -> bool {
        matches!(self, StakeDecision::Skip(_))
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Mined transaction receipt, reduced to what the watcher logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    /// `true` when the transaction executed successfully.
    pub status: bool,
    pub gas_used: u64,
}

// ---------------------------------------------------------------------------
// Token units
// ---------------------------------------------------------------------------

/// Largest scale `rust_decimal` can carry.
const MAX_DECIMALS: u32 = 28;

/// Converts between smallest on-chain units and human decimal units.
///
/// Both directions are exact. Values that do not fit a `Decimal` at the
/// token's scale are rejected rather than rounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUnits {
    decimals: u32,
    symbol: String,
}

impl TokenUnits {
    pub fn new(decimals: u32, symbol: impl Into<String>) -> Result<Self, StakerError> {
        if decimals > MAX_DECIMALS {
            return Err(StakerError::Config(format!(
                "token decimals must be at most {MAX_DECIMALS}, got {decimals}"
            )));
        }
        Ok(Self {
            decimals,
            symbol: symbol.into(),
        })
    }

    /// 18-decimal LINK.
    pub fn link() -> Self {
        Self {
            decimals: 18,
            symbol: "LINK".to_string(),
        }
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Smallest units → decimal units.
    pub fn to_decimal(&self, raw: U256) -> Result<Decimal, StakerError> {
        let mantissa = i128::try_from(raw)
            .map_err(|_| StakerError::Amount(format!("{raw} exceeds decimal range")))?;
        Decimal::try_from_i128_with_scale(mantissa, self.decimals)
            .map(|d| d.normalize())
            .map_err(|e| StakerError::Amount(format!("{raw} not representable: {e}")))
    }

    /// Decimal units → smallest units. Fails on negative values and on
    /// fractions finer than one smallest unit.
    pub fn to_base_units(&self, amount: Decimal) -> Result<U256, StakerError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(StakerError::Amount(format!("negative amount {amount}")));
        }
        let amount = amount.normalize();
        if amount.scale() > self.decimals {
            return Err(StakerError::Amount(format!(
                "{amount} has more than {} decimal places",
                self.decimals
            )));
        }
        let mantissa = amount.mantissa().unsigned_abs();
        let exponent = U256::from(self.decimals - amount.scale());
        Ok(U256::from(mantissa) * U256::from(10u64).pow(exponent))
    }

    /// `12.5 LINK` style rendering.
    pub fn format(&self, raw: U256) -> String {
        match self.to_decimal(raw) {
            Ok(d) => format!("{d} {}", self.symbol),
            Err(_) => format!("{raw} (base units)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Every failure a cycle, the startup path, or a confirmation watcher can
/// produce. Only `Config` is fatal.
#[derive(Debug, thiserror::Error)]
pub enum StakerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chain read failed ({call}): {message}")]
    ChainRead { call: &'static str, message: String },

    #[error("Amount conversion failed: {0}")]
    Amount(String),

    #[error("Transaction build failed: {0}")]
    TransactionBuild(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    #[error("Confirmation failed for {hash}: {message}")]
    Confirmation { hash: B256, message: String },
}

impl StakerError {
    /// Whether the agent can keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, StakerError::Config(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
