//! Configuration loading.
//!
//! Required settings come from the environment (a `.env` file is loaded
//! by `main` beforehand). Non-secret tuning lives in an optional TOML file,
//! `staker.toml` by default or whatever `STAKER_CONFIG` points at; every
//! key in it has a default, so the file may be absent entirely.

use alloy_primitives::Address;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::types::StakerError;

pub const ENV_RPC: &str = "ETHEREUM_RPC";
pub const ENV_PRIVATE_KEY: &str = "PRIVATE_KEY";
pub const ENV_STAKING_CONTRACT: &str = "STAKING_CONTRACT_ADDRESS";
pub const ENV_INTERVAL_MS: &str = "INTERVAL_MS";
pub const ENV_TUNING_PATH: &str = "STAKER_CONFIG";

const DEFAULT_TUNING_PATH: &str = "staker.toml";

/// Everything the agent needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rpc_endpoint: String,
    /// `0x`-prefixed operator key. Never logged.
    pub operator_private_key: SecretString,
    pub staking_contract: Address,
    pub poll_interval: Duration,
    pub tuning: Tuning,
}

/// Optional knobs from the TOML file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Tuning {
    pub agent: AgentTuning,
    pub token: TokenTuning,
    pub transaction: TransactionTuning,
    pub confirmation: ConfirmationTuning,
    pub rpc: RpcTuning,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentTuning {
    /// Stake again even while an earlier stake is unconfirmed.
    pub allow_overlapping_stakes: bool,
    /// Render the boxed pool table each cycle.
    pub pool_table: bool,
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            allow_overlapping_stakes: false,
            pool_table: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TokenTuning {
    pub decimals: u32,
    pub symbol: String,
}

impl Default for TokenTuning {
    fn default() -> Self {
        Self {
            decimals: 18,
            symbol: "LINK".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransactionTuning {
    pub gas_limit: u64,
}

impl Default for TransactionTuning {
    fn default() -> Self {
        Self { gas_limit: 200_000 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfirmationTuning {
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ConfirmationTuning {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            poll_interval_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RpcTuning {
    pub request_timeout_secs: u64,
}

impl Default for RpcTuning {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load from the process environment and the optional tuning file.
    pub fn from_env() -> Result<Self, StakerError> {
        let tuning_path =
            std::env::var(ENV_TUNING_PATH).unwrap_or_else(|_| DEFAULT_TUNING_PATH.to_string());
        let tuning = Tuning::load(Path::new(&tuning_path))?;
        Self::from_lookup(|key| std::env::var(key).ok(), tuning)
    }

    /// Build from an arbitrary key lookup. Split out so tests do not have
    /// to mutate the process environment.
    pub fn from_lookup<F>(lookup: F, tuning: Tuning) -> Result<Self, StakerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| -> Result<String, StakerError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| StakerError::Config(format!("missing required variable {key}")))
        };

        let rpc_endpoint = require(ENV_RPC)?;
        if !rpc_endpoint.starts_with("http://") && !rpc_endpoint.starts_with("https://") {
            return Err(StakerError::Config(format!(
                "{ENV_RPC} must be an http(s) URL"
            )));
        }

        let private_key = normalize_hex(&require(ENV_PRIVATE_KEY)?);
        if private_key.len() != 66 || !is_hex(&private_key[2..]) {
            // Do not echo the value.
            return Err(StakerError::Config(format!(
                "{ENV_PRIVATE_KEY} must be 32 bytes of hex"
            )));
        }

        let staking_raw = normalize_hex(&require(ENV_STAKING_CONTRACT)?);
        let staking_contract = Address::from_str(&staking_raw).map_err(|e| {
            StakerError::Config(format!(
                "{ENV_STAKING_CONTRACT} is not a valid address ({staking_raw}): {e}"
            ))
        })?;

        let interval_raw = require(ENV_INTERVAL_MS)?;
        let interval_ms: u64 = interval_raw.parse().map_err(|_| {
            StakerError::Config(format!(
                "{ENV_INTERVAL_MS} must be an integer, got {interval_raw}"
            ))
        })?;
        if interval_ms == 0 {
            return Err(StakerError::Config(format!(
                "{ENV_INTERVAL_MS} must be greater than zero"
            )));
        }

        Ok(Self {
            rpc_endpoint,
            operator_private_key: SecretString::new(private_key),
            staking_contract,
            poll_interval: Duration::from_millis(interval_ms),
            tuning,
        })
    }
}

impl Tuning {
    /// Read the tuning file; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, StakerError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|e| {
            StakerError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&contents)
            .map_err(|e| StakerError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// Prefix with `0x` when missing.
pub fn normalize_hex(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        format!("0x{}", &trimmed[2..])
    } else {
        format!("0x{trimmed}")
    }
}

fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}
