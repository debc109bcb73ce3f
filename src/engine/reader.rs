//! Pool state reader.
//!
//! Queries the staking contract and the token contract for the values the
//! decision engine needs. Reads run one after another; the snapshot is only
//! returned once all five have succeeded.

use alloy_primitives::{Address, Bytes};
use tracing::{debug, info};

use crate::chain::abi::{self, AbiError};
use crate::chain::RpcError;
use crate::context::AgentContext;
use crate::types::{PoolSnapshot, StakerError};

/// Resolve the token address from `getChainlinkToken()`, once per process.
///
/// A failed lookup leaves the cache empty so the next cycle tries again.
pub async fn resolve_link_token_address(ctx: &AgentContext) -> Result<Address, StakerError> {
    ctx.token_cache()
        .get_or_try_init(|| async {
            let ret = view_no_args(ctx, ctx.staking_contract, abi::GET_CHAINLINK_TOKEN).await?;
            let token = abi::decode_address(abi::GET_CHAINLINK_TOKEN, &ret)
                .map_err(|e| abi_failure(abi::GET_CHAINLINK_TOKEN, e))?;
            info!(token = %token, "Resolved staking token address");
            Ok::<_, StakerError>(token)
        })
        .await
        .copied()
}

/// Read `isOpen`, `isActive`, `getMaxPoolSize`, `getTotalPrincipal` and the
/// operator's token balance.
pub async fn read_snapshot(
    ctx: &AgentContext,
    token: Address,
) -> Result<PoolSnapshot, StakerError> {
    let staking = ctx.staking_contract;

    let ret = view_no_args(ctx, staking, abi::IS_OPEN).await?;
    let is_open =
        abi::decode_bool(abi::IS_OPEN, &ret).map_err(|e| abi_failure(abi::IS_OPEN, e))?;

    let ret = view_no_args(ctx, staking, abi::IS_ACTIVE).await?;
    let is_active =
        abi::decode_bool(abi::IS_ACTIVE, &ret).map_err(|e| abi_failure(abi::IS_ACTIVE, e))?;

    let ret = view_no_args(ctx, staking, abi::GET_MAX_POOL_SIZE).await?;
    let max_pool_size = abi::decode_uint256(abi::GET_MAX_POOL_SIZE, &ret)
        .map_err(|e| abi_failure(abi::GET_MAX_POOL_SIZE, e))?;

    let ret = view_no_args(ctx, staking, abi::GET_TOTAL_PRINCIPAL).await?;
    let total_principal = abi::decode_uint256(abi::GET_TOTAL_PRINCIPAL, &ret)
        .map_err(|e| abi_failure(abi::GET_TOTAL_PRINCIPAL, e))?;

    let calldata = abi::encode_balance_of(ctx.account.address());
    let ret = view(ctx, token, abi::BALANCE_OF, calldata).await?;
    let operator_balance = abi::decode_uint256(abi::BALANCE_OF, &ret)
        .map_err(|e| abi_failure(abi::BALANCE_OF, e))?;

    let snapshot = PoolSnapshot {
        is_open,
        is_active,
        max_pool_size,
        total_principal,
        operator_balance,
    };
    debug!(?snapshot, "Pool snapshot read");
    Ok(snapshot)
}

async fn view_no_args(
    ctx: &AgentContext,
    contract: Address,
    call: &'static str,
) -> Result<Bytes, StakerError> {
    view(ctx, contract, call, abi::encode_call(call)).await
}

async fn view(
    ctx: &AgentContext,
    contract: Address,
    call: &'static str,
    calldata: Bytes,
) -> Result<Bytes, StakerError> {
    ctx.client
        .call_view(contract, calldata)
        .await
        .map_err(|e| rpc_failure(call, e))
}

fn rpc_failure(call: &'static str, err: RpcError) -> StakerError {
    StakerError::ChainRead {
        call,
        message: err.to_string(),
    }
}

fn abi_failure(call: &'static str, err: AbiError) -> StakerError {
    StakerError::ChainRead {
        call,
        message: err.to_string(),
    }
}
