//! LINK Pool Staker — staking pool deposit agent
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the agent context and runs the check→decide→stake loop until
//! Ctrl+C. Shutdown is immediate: pending confirmations are not awaited.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use link_staker::chain::rpc::{HttpRpcClient, ReceiptPolling};
use link_staker::chain::tx::Account;
use link_staker::config::AppConfig;
use link_staker::context::{AgentContext, StakingParams};
use link_staker::engine::scheduler::Scheduler;
use link_staker::types::TokenUnits;

const BANNER: &str = r#"
 _     ___ _   _ _  __   ____  _        _
| |   |_ _| \ | | |/ /  / ___|| |_ __ _| | _____ _ __
| |    | ||  \| | ' /   \___ \| __/ _` | |/ / _ \ '__|
| |___ | || |\  | . \    ___) | || (_| |   <  __/ |
|_____|___|_| \_|_|\_\  |____/ \__\__,_|_|\_\___|_|

  Staking pool deposit agent
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    // Missing or malformed settings stop us here, before anything runs.
    let cfg = AppConfig::from_env().context("Failed to load configuration")?;

    println!("{BANNER}");

    let units = TokenUnits::new(cfg.tuning.token.decimals, cfg.tuning.token.symbol.clone())
        .context("Invalid token settings")?;

    let client = HttpRpcClient::new(
        cfg.rpc_endpoint.clone(),
        Duration::from_secs(cfg.tuning.rpc.request_timeout_secs),
        ReceiptPolling {
            timeout: Duration::from_secs(cfg.tuning.confirmation.timeout_secs),
            interval: Duration::from_millis(cfg.tuning.confirmation.poll_interval_ms),
        },
    )
    .context("Failed to build RPC client")?;

    let account = Account::from_private_key(cfg.operator_private_key.clone())
        .map_err(|e| anyhow::anyhow!("Invalid operator key: {e}"))?;

    info!(
        operator = %account.address(),
        staking_contract = %cfg.staking_contract,
        interval_ms = cfg.poll_interval.as_millis() as u64,
        gas_limit = cfg.tuning.transaction.gas_limit,
        token = units.symbol(),
        allow_overlapping_stakes = cfg.tuning.agent.allow_overlapping_stakes,
        "Staking agent starting up"
    );

    let ctx = AgentContext::new(
        Arc::new(client),
        account,
        cfg.staking_contract,
        units,
        StakingParams {
            gas_limit: cfg.tuning.transaction.gas_limit,
            allow_overlapping_stakes: cfg.tuning.agent.allow_overlapping_stakes,
            pool_table: cfg.tuning.agent.pool_table,
        },
    );

    info!(
        interval_ms = cfg.poll_interval.as_millis() as u64,
        "Cronjob started. Press Ctrl+C to stop."
    );

    let mut scheduler = Scheduler::new(ctx, cfg.poll_interval);
    scheduler
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received.");
        })
        .await;

    info!("Cronjob stopped.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("link_staker=info"));

    let json_logging = std::env::var("STAKER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
