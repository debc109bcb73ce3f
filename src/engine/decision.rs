//! Stake decision engine.
//!
//! Pure function from a `PoolSnapshot` to a `StakeDecision`. The comparison
//! and the stake amount are computed in smallest units, so any uint256 the
//! contracts return is handled exactly. `PoolView` is the decimal rendering
//! of the same numbers for the log output.

use alloy_primitives::U256;
use rust_decimal::Decimal;

use crate::types::{PoolSnapshot, SkipReason, StakeDecision, StakerError, TokenUnits};

/// Decimal view of a snapshot, used for the pool summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolView {
    pub max_pool_size: Decimal,
    pub total_staked: Decimal,
    pub available_space: Decimal,
    pub operator_balance: Decimal,
}

impl PoolView {
    /// Fails with `StakerError::Amount` when a value is beyond `Decimal`
    /// range. Callers treat that as a display problem only.
    pub fn from_snapshot(snapshot: &PoolSnapshot, units: &TokenUnits) -> Result<Self, StakerError> {
        Ok(Self {
            max_pool_size: units.to_decimal(snapshot.max_pool_size)?,
            total_staked: units.to_decimal(snapshot.total_principal)?,
            available_space: units.to_decimal(snapshot.available_space())?,
            operator_balance: units.to_decimal(snapshot.operator_balance)?,
        })
    }

    /// The most that can be staked right now.
    pub fn stakeable(&self) -> Decimal {
        self.available_space.min(self.operator_balance)
    }
}

/// The most that can be staked for `snapshot`, in smallest units.
pub fn stakeable(snapshot: &PoolSnapshot) -> U256 {
    snapshot.available_space().min(snapshot.operator_balance)
}

/// Decide whether to stake, and how much.
///
/// Closed or inactive pools skip before any amounts are looked at.
pub fn decide(snapshot: &PoolSnapshot) -> StakeDecision {
    if !snapshot.is_open {
        return StakeDecision::Skip(SkipReason::PoolClosed);
    }
    if !snapshot.is_active {
        return StakeDecision::Skip(SkipReason::PoolInactive);
    }
    if snapshot.available_space().is_zero() {
        return StakeDecision::Skip(SkipReason::PoolFull);
    }

    let amount = stakeable(snapshot);
    if amount.is_zero() {
        return StakeDecision::Skip(SkipReason::NoBalance);
    }
    StakeDecision::Stake { amount }
}
