//! Transaction submitter.
//!
//! Turns a `Stake` decision into a signed `transferAndCall` on the token
//! contract and broadcasts it. Confirmation is tracked by a detached watcher
//! task whose outcome only ever reaches the log: it never feeds back into
//! the scheduler or triggers a retry.

use alloy_primitives::{Address, B256, U256};
use tracing::{error, info, warn};

use crate::chain::abi;
use crate::chain::tx::LegacyTransaction;
use crate::context::AgentContext;
use crate::types::{StakeDecision, StakerError};

/// Submit `decision`. `Skip` is a no-op and returns `None`.
///
/// `token` is the ERC-677 contract the transaction is sent to; the staking
/// contract is the `transferAndCall` recipient.
pub async fn submit(
    ctx: &AgentContext,
    token: Address,
    decision: StakeDecision,
) -> Result<Option<B256>, StakerError> {
    let amount = match decision {
        StakeDecision::Skip(_) => return Ok(None),
        StakeDecision::Stake { amount } => amount,
    };

    info!(amount = %ctx.units.format(amount), "Staking");

    let tx = build_transaction(ctx, token, amount).await?;
    let signed = ctx.account.sign(&tx).map_err(StakerError::Signing)?;

    let hash = ctx
        .client
        .send_raw_transaction(signed.raw)
        .await
        .map_err(|e| StakerError::Broadcast(e.to_string()))?;
    if hash != signed.hash {
        warn!(node = %hash, local = %signed.hash, "Node reported a different transaction hash");
    }
    info!(tx_hash = %hash, nonce = tx.nonce, "Stake transaction broadcast");

    spawn_confirmation_watcher(ctx, hash);
    Ok(Some(hash))
}

/// Fetch nonce, gas price and chain id and assemble the stake transaction.
pub async fn build_transaction(
    ctx: &AgentContext,
    token: Address,
    amount: U256,
) -> Result<LegacyTransaction, StakerError> {
    let from = ctx.account.address();
    let nonce = ctx
        .client
        .transaction_count(from)
        .await
        .map_err(|e| StakerError::TransactionBuild(format!("nonce lookup failed: {e}")))?;
    let gas_price = ctx
        .client
        .gas_price()
        .await
        .map_err(|e| StakerError::TransactionBuild(format!("gas price lookup failed: {e}")))?;
    let chain_id = ctx
        .client
        .chain_id()
        .await
        .map_err(|e| StakerError::TransactionBuild(format!("chain id lookup failed: {e}")))?;

    Ok(LegacyTransaction {
        chain_id,
        nonce,
        gas_price,
        gas_limit: ctx.params.gas_limit,
        to: token,
        value: U256::ZERO,
        data: abi::encode_transfer_and_call(ctx.staking_contract, amount, &[]),
    })
}

/// Fire-and-forget: the `JoinHandle` is dropped on purpose. The pending
/// guard moves into the task so the overlap check sees the stake as in
/// flight until the watcher finishes, whatever the outcome.
fn spawn_confirmation_watcher(ctx: &AgentContext, hash: B256) {
    let client = ctx.client.clone();
    let guard = ctx.track_pending();

    tokio::spawn(async move {
        let _guard = guard;
        match client.wait_for_receipt(hash).await {
            Ok(receipt) if receipt.status => info!(
                tx_hash = %hash,
                block = receipt.block_number,
                gas_used = receipt.gas_used,
                "Tx confirmed"
            ),
            Ok(receipt) => warn!(
                tx_hash = %hash,
                block = receipt.block_number,
                gas_used = receipt.gas_used,
                "Tx mined but reverted"
            ),
            Err(e) => {
                let err = StakerError::Confirmation {
                    hash,
                    message: e.to_string(),
                };
                error!(error = %err, "Receipt error");
            }
        }
    });
}
