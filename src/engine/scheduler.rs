//! Scheduler — runs one check→decide→stake cycle, sleeps, repeats.
//!
//! The period is "run, then sleep N": cycle time is not subtracted, so the
//! schedule drifts by each cycle's own runtime. Cycles never overlap. On
//! shutdown the loop stops immediately; a cycle in progress is dropped and
//! confirmation watchers are left to the runtime.

use alloy_primitives::B256;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::decision::{self, PoolView};
use super::reader;
use super::submitter;
use crate::context::AgentContext;
use crate::report::PoolSummary;
use crate::types::{PoolSnapshot, SkipReason, StakeDecision, StakerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopped,
}

/// What one successful cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub snapshot: PoolSnapshot,
    pub decision: StakeDecision,
    pub tx_hash: Option<B256>,
}

/// Counters kept for the shutdown log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub cycles: u64,
    pub stakes: u64,
    pub failures: u64,
}

pub struct Scheduler {
    ctx: AgentContext,
    interval: Duration,
    state: SchedulerState,
    stats: SchedulerStats,
}

impl Scheduler {
    pub fn new(ctx: AgentContext, interval: Duration) -> Self {
        Self {
            ctx,
            interval,
            state: SchedulerState::Running,
            stats: SchedulerStats::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    /// Loop until `shutdown` resolves.
    pub async fn run_until<F>(&mut self, shutdown: F) -> SchedulerStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(interval_ms = self.interval.as_millis() as u64, "Scheduler started");

        while self.state == SchedulerState::Running {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    self.state = SchedulerState::Stopped;
                }
                _ = Self::tick_then_sleep(&self.ctx, self.interval, &mut self.stats) => {}
            }
        }

        info!(
            cycles = self.stats.cycles,
            stakes = self.stats.stakes,
            failures = self.stats.failures,
            pending_confirmations = self.ctx.pending_confirmations(),
            "Scheduler stopped"
        );
        self.stats
    }

    async fn tick_then_sleep(ctx: &AgentContext, interval: Duration, stats: &mut SchedulerStats) {
        stats.cycles += 1;
        match run_cycle(ctx).await {
            Ok(report) => {
                if report.tx_hash.is_some() {
                    stats.stakes += 1;
                }
                let elapsed_ms = (Utc::now() - report.started_at).num_milliseconds();
                debug!(
                    cycle = stats.cycles,
                    started_at = %report.started_at,
                    elapsed_ms,
                    decision = ?report.decision,
                    "Cycle complete"
                );
            }
            Err(err) => {
                stats.failures += 1;
                log_cycle_error(stats.cycles, &err);
            }
        }
        tokio::time::sleep(interval).await;
    }
}

/// One full cycle: resolve token, read pool, decide, maybe submit.
pub async fn run_cycle(ctx: &AgentContext) -> Result<CycleReport, StakerError> {
    let started_at = Utc::now();

    let token = reader::resolve_link_token_address(ctx).await?;
    let snapshot = reader::read_snapshot(ctx, token).await?;
    let mut decision = decision::decide(&snapshot);

    if snapshot.is_open && snapshot.is_active {
        log_pool(ctx, &snapshot);
    }

    if !decision.is_skip()
        && !ctx.params.allow_overlapping_stakes
        && ctx.pending_confirmations() > 0
    {
        decision = StakeDecision::Skip(SkipReason::PendingConfirmation);
    }

    if let StakeDecision::Skip(reason) = decision {
        debug!(%reason, "Not staking this cycle");
    }

    let tx_hash = submitter::submit(ctx, token, decision).await?;

    Ok(CycleReport {
        started_at,
        snapshot,
        decision,
        tx_hash,
    })
}

/// Pool summary for the log. Values outside `Decimal` range fall back to
/// base-unit rendering; they never affect the decision.
fn log_pool(ctx: &AgentContext, snapshot: &PoolSnapshot) {
    match PoolView::from_snapshot(snapshot, &ctx.units) {
        Ok(view) => {
            let summary = PoolSummary::new(&view, ctx.units.symbol());
            info!("{}", summary.one_line());
            if ctx.params.pool_table {
                info!("\n{summary}");
            }
        }
        Err(_) => info!(
            "Pool: {}/{}, Av.: {}",
            ctx.units.format(snapshot.total_principal),
            ctx.units.format(snapshot.max_pool_size),
            ctx.units.format(snapshot.available_space())
        ),
    }
}

/// Every variant is recoverable here; the loop always continues.
fn log_cycle_error(cycle: u64, err: &StakerError) {
    match err {
        StakerError::ChainRead { call, message } => {
            warn!(cycle, call = *call, error = %message, "Pool read failed, skipping cycle")
        }
        StakerError::Amount(message) => {
            error!(cycle, error = %message, "Amount conversion failed, skipping cycle")
        }
        StakerError::TransactionBuild(message) => {
            error!(cycle, error = %message, "Could not build stake transaction")
        }
        StakerError::Signing(message) => {
            error!(cycle, error = %message, "Could not sign stake transaction")
        }
        StakerError::Broadcast(message) => {
            error!(cycle, error = %message, "Stake transaction was not accepted")
        }
        StakerError::Confirmation { hash, message } => {
            error!(cycle, tx_hash = %hash, error = %message, "Confirmation error")
        }
        StakerError::Config(message) => {
            error!(cycle, error = %message, "Configuration error during cycle")
        }
    }
}
