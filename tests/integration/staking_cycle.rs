//! End-to-end staking cycles against `MockChain`.
//!
//! Drives the public engine API exactly as the binary does: one
//! `AgentContext`, repeated `run_cycle` calls or a `Scheduler` run.

use alloy_primitives::{Address, U256};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

use link_staker::chain::abi;
use link_staker::chain::tx::Account;
use link_staker::context::{AgentContext, StakingParams};
use link_staker::engine::scheduler::{run_cycle, Scheduler, SchedulerState};
use link_staker::types::{SkipReason, StakeDecision, StakerError, TokenUnits};

use crate::mock_chain::{link, MockChain, PoolState};

const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn staking_contract() -> Address {
    Address::repeat_byte(0x5a)
}

fn agent(chain: &MockChain, params: StakingParams) -> AgentContext {
    AgentContext::new(
        Arc::new(chain.clone()),
        Account::from_private_key(SecretString::new(DEV_KEY.to_string())).unwrap(),
        staking_contract(),
        TokenUnits::link(),
        params,
    )
}

/// True if `raw` carries the `transferAndCall` payload for `amount`.
fn stakes_amount(raw: &[u8], amount: U256) -> bool {
    let payload = abi::encode_transfer_and_call(staking_contract(), amount, &[]);
    raw.windows(payload.len()).any(|w| w == &payload[..])
}

async fn wait_until_confirmed(ctx: &AgentContext) {
    for _ in 0..100 {
        if ctx.pending_confirmations() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("confirmation watcher never finished");
}

// ---------------------------------------------------------------------------
// Token address resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_token_address_resolved_once_across_cycles() {
    let chain = MockChain::new(PoolState::open(1000, 1000, 50));
    let ctx = agent(&chain, StakingParams::default());
    assert!(ctx.cached_token_address().is_none());

    for _ in 0..4 {
        let report = run_cycle(&ctx).await.unwrap();
        assert_eq!(report.decision, StakeDecision::Skip(SkipReason::PoolFull));
    }

    assert_eq!(chain.call_count(abi::GET_CHAINLINK_TOKEN), 1);
    assert_eq!(chain.call_count(abi::IS_OPEN), 4);
    assert_eq!(ctx.cached_token_address(), Some(chain.token));
}

#[tokio::test]
async fn test_failed_resolution_is_retried_next_cycle() {
    let chain = MockChain::new(PoolState::open(1000, 400, 300));
    let ctx = agent(&chain, StakingParams::default());

    chain.fail_view(abi::GET_CHAINLINK_TOKEN, "connection refused");
    let err = run_cycle(&ctx).await.unwrap_err();
    assert!(matches!(err, StakerError::ChainRead { .. }));
    assert!(err.is_recoverable());
    assert!(ctx.cached_token_address().is_none());
    assert_eq!(chain.call_count(abi::IS_OPEN), 0);

    chain.clear_errors();
    let report = tokio_test::assert_ok!(run_cycle(&ctx).await);
    assert!(report.tx_hash.is_some());
    assert_eq!(chain.call_count(abi::GET_CHAINLINK_TOKEN), 2);
}

// ---------------------------------------------------------------------------
// Stake amounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_stake_limited_by_balance() {
    let chain = MockChain::new(PoolState::open(1000, 400, 300));
    let ctx = agent(&chain, StakingParams::default());

    let report = run_cycle(&ctx).await.unwrap();
    assert_eq!(report.decision, StakeDecision::Stake { amount: link(300) });

    let sent = chain.broadcasts();
    assert_eq!(sent.len(), 1);
    assert!(stakes_amount(&sent[0], link(300)));
    wait_until_confirmed(&ctx).await;
}

#[tokio::test]
async fn test_stake_limited_by_space() {
    let chain = MockChain::new(PoolState::open(1000, 400, 900));
    let ctx = agent(&chain, StakingParams::default());

    let report = run_cycle(&ctx).await.unwrap();
    assert_eq!(report.decision, StakeDecision::Stake { amount: link(600) });
    assert!(stakes_amount(&chain.broadcasts()[0], link(600)));
}

#[tokio::test]
async fn test_closed_or_inactive_pool_sends_nothing() {
    let chain = MockChain::new(PoolState {
        is_open: false,
        ..PoolState::open(1000, 0, 500)
    });
    let ctx = agent(&chain, StakingParams::default());

    let report = run_cycle(&ctx).await.unwrap();
    assert_eq!(report.decision, StakeDecision::Skip(SkipReason::PoolClosed));

    chain.set_pool(PoolState {
        is_active: false,
        ..PoolState::open(1000, 0, 500)
    });
    let report = run_cycle(&ctx).await.unwrap();
    assert_eq!(report.decision, StakeDecision::Skip(SkipReason::PoolInactive));

    assert!(chain.broadcasts().is_empty());
}

#[tokio::test]
async fn test_empty_balance_sends_nothing() {
    let chain = MockChain::new(PoolState::open(1000, 400, 0));
    let ctx = agent(&chain, StakingParams::default());

    let report = run_cycle(&ctx).await.unwrap();
    assert_eq!(report.decision, StakeDecision::Skip(SkipReason::NoBalance));
    assert!(chain.broadcasts().is_empty());
}

#[tokio::test]
async fn test_oversized_pool_cap_still_stakes() {
    // A cap of 1e29 base units is valid on-chain but beyond Decimal range.
    let chain = MockChain::new(PoolState {
        max_pool_size: link(100_000_000_000),
        ..PoolState::open(0, 400, 300)
    });
    let ctx = agent(&chain, StakingParams::default());

    let report = run_cycle(&ctx).await.unwrap();
    assert_eq!(report.decision, StakeDecision::Stake { amount: link(300) });
    assert!(stakes_amount(&chain.broadcasts()[0], link(300)));
    wait_until_confirmed(&ctx).await;
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_failed_read_aborts_cycle_without_stake() {
    let chain = MockChain::new(PoolState::open(1000, 400, 300));
    let ctx = agent(&chain, StakingParams::default());

    chain.fail_view(abi::GET_MAX_POOL_SIZE, "timeout");
    let err = run_cycle(&ctx).await.unwrap_err();
    match err {
        StakerError::ChainRead { call, .. } => assert_eq!(call, abi::GET_MAX_POOL_SIZE),
        other => panic!("unexpected error: {other}"),
    }
    // Reads after the failing one are never made.
    assert_eq!(chain.call_count(abi::GET_TOTAL_PRINCIPAL), 0);
    assert_eq!(chain.call_count(abi::BALANCE_OF), 0);
    assert!(chain.broadcasts().is_empty());

    chain.clear_errors();
    let report = run_cycle(&ctx).await.unwrap();
    assert_eq!(report.decision, StakeDecision::Stake { amount: link(300) });
}

#[tokio::test]
async fn test_rejected_broadcast_is_recoverable() {
    let chain = MockChain::new(PoolState::open(1000, 400, 300));
    let ctx = agent(&chain, StakingParams::default());

    chain.fail_broadcast("insufficient funds for gas * price + value");
    let err = run_cycle(&ctx).await.unwrap_err();
    assert!(matches!(err, StakerError::Broadcast(_)));
    assert!(err.is_recoverable());
    assert_eq!(ctx.pending_confirmations(), 0);
}

#[tokio::test]
async fn test_reverted_stake_only_reaches_the_log() {
    let chain = MockChain::new(PoolState::open(1000, 400, 300));
    chain.revert_transactions();
    let ctx = agent(&chain, StakingParams::default());

    let report = run_cycle(&ctx).await.unwrap();
    assert!(report.tx_hash.is_some());
    wait_until_confirmed(&ctx).await;

    // Nothing is retried: the next cycle stakes afresh from pool state.
    run_cycle(&ctx).await.unwrap();
    assert_eq!(chain.broadcasts().len(), 2);
}

// ---------------------------------------------------------------------------
// Overlapping stakes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unconfirmed_stake_blocks_the_next() {
    let chain = MockChain::new(PoolState::open(1000, 400, 300));
    chain.hold_receipts();
    let ctx = agent(&chain, StakingParams::default());

    let first = run_cycle(&ctx).await.unwrap();
    assert!(first.tx_hash.is_some());
    assert_eq!(ctx.pending_confirmations(), 1);

    let second = run_cycle(&ctx).await.unwrap();
    assert_eq!(
        second.decision,
        StakeDecision::Skip(SkipReason::PendingConfirmation)
    );
    assert_eq!(chain.broadcasts().len(), 1);

    chain.release_receipts();
    wait_until_confirmed(&ctx).await;

    let third = run_cycle(&ctx).await.unwrap();
    assert!(third.tx_hash.is_some());
    assert_eq!(chain.broadcasts().len(), 2);
}

#[tokio::test]
async fn test_overlapping_stakes_when_allowed() {
    let chain = MockChain::new(PoolState::open(1000, 400, 300));
    chain.hold_receipts();
    let ctx = agent(
        &chain,
        StakingParams {
            allow_overlapping_stakes: true,
            ..StakingParams::default()
        },
    );

    run_cycle(&ctx).await.unwrap();
    run_cycle(&ctx).await.unwrap();

    assert_eq!(chain.broadcasts().len(), 2);
    assert_eq!(ctx.pending_confirmations(), 2);

    chain.release_receipts();
    wait_until_confirmed(&ctx).await;
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_scheduler_keeps_cycling_through_failures() {
    let chain = MockChain::new(PoolState::open(1000, 400, 300));
    chain.fail_view(abi::IS_OPEN, "503 from upstream");
    let mut scheduler = Scheduler::new(
        agent(&chain, StakingParams::default()),
        Duration::from_millis(5),
    );

    let stats = scheduler
        .run_until(tokio::time::sleep(Duration::from_millis(80)))
        .await;

    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert!(stats.cycles >= 3, "only {} cycles ran", stats.cycles);
    assert_eq!(stats.stakes, 0);
    assert!(chain.call_count(abi::IS_OPEN) >= 3);
    assert_eq!(chain.call_count(abi::GET_CHAINLINK_TOKEN), 1);
}

#[tokio::test]
async fn test_scheduler_runs_first_cycle_immediately() {
    let chain = MockChain::new(PoolState::open(1000, 400, 300));
    let mut scheduler = Scheduler::new(
        agent(&chain, StakingParams::default()),
        Duration::from_secs(3600),
    );

    let stats = scheduler
        .run_until(tokio::time::sleep(Duration::from_millis(100)))
        .await;

    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.stakes, 1);
    assert_eq!(chain.broadcasts().len(), 1);
    wait_until_confirmed(scheduler.context()).await;
}
