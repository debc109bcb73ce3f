//! JSON-RPC over HTTP.
//!
//! Production `ChainClient`. Every call is a single POST to the configured
//! node; the only timeout is the HTTP client's own request timeout, plus
//! the receipt wait deadline.

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::{ChainClient, RpcError};
use crate::types::Receipt;

/// How the client waits for a transaction to be mined.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptPolling {
    pub timeout: Duration,
    pub interval: Duration,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    status: Option<String>,
    gas_used: String,
}

pub struct HttpRpcClient {
    http: Client,
    url: String,
    receipts: ReceiptPolling,
}

impl HttpRpcClient {
    pub fn new(
        url: impl Into<String>,
        request_timeout: Duration,
        receipts: ReceiptPolling,
    ) -> Result<Self, RpcError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            url: url.into(),
            receipts,
        })
    }

    /// Send one request and return its `result`. A JSON `null` result is
    /// passed through for callers that treat it as "not yet".
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });
        debug!(method, "rpc request");

        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(format!("{method}: {e}")))?;

        if !resp.status().is_success() {
            return Err(RpcError::Status(resp.status().as_u16()));
        }

        let parsed: RpcResponse = resp.json().await.map_err(|e| RpcError::Decode {
            field: format!("{method} response"),
            message: e.to_string(),
        })?;

        if let Some(err) = parsed.error {
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(parsed.result.unwrap_or(Value::Null))
    }

    async fn request_str(&self, method: &str, params: Value) -> Result<String, RpcError> {
        match self.request(method, params).await? {
            Value::String(s) => Ok(s),
            other => Err(RpcError::Decode {
                field: method.to_string(),
                message: format!("expected string result, got {other}"),
            }),
        }
    }

    async fn receipt(&self, hash: B256) -> Result<Option<Receipt>, RpcError> {
        let value = self
            .request("eth_getTransactionReceipt", json!([to_hex(hash.as_slice())]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        let raw: RpcReceipt = serde_json::from_value(value).map_err(|e| RpcError::Decode {
            field: "eth_getTransactionReceipt".to_string(),
            message: e.to_string(),
        })?;
        // Some nodes return a receipt shell before the block is assigned.
        let Some(block_number) = raw.block_number.as_deref() else {
            return Ok(None);
        };
        Ok(Some(Receipt {
            transaction_hash: parse_b256(&raw.transaction_hash, "transactionHash")?,
            block_number: parse_hex_u64(block_number, "blockNumber")?,
            status: raw.status.as_deref().map(|s| parse_hex_u64(s, "status")).transpose()?
                == Some(1),
            gas_used: parse_hex_u64(&raw.gas_used, "gasUsed")?,
        }))
    }
}

#[async_trait]
impl ChainClient for HttpRpcClient {
    async fn call_view(&self, contract: Address, calldata: Bytes) -> Result<Bytes, RpcError> {
        let raw = self
            .request_str(
                "eth_call",
                json!([
                    { "to": to_hex(contract.as_slice()), "data": to_hex(&calldata) },
                    "latest"
                ]),
            )
            .await?;
        parse_bytes(&raw, "eth_call")
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, RpcError> {
        let raw = self
            .request_str("eth_getTransactionCount", json!([to_hex(address.as_slice()), "pending"]))
            .await?;
        parse_hex_u64(&raw, "eth_getTransactionCount")
    }

    async fn gas_price(&self) -> Result<U256, RpcError> {
        let raw = self.request_str("eth_gasPrice", json!([])).await?;
        parse_hex_u256(&raw, "eth_gasPrice")
    }

    async fn chain_id(&self) -> Result<u64, RpcError> {
        let raw = self.request_str("eth_chainId", json!([])).await?;
        parse_hex_u64(&raw, "eth_chainId")
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, RpcError> {
        let hash = self
            .request_str("eth_sendRawTransaction", json!([to_hex(&raw)]))
            .await?;
        parse_b256(&hash, "eth_sendRawTransaction")
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<Receipt, RpcError> {
        let deadline = tokio::time::Instant::now() + self.receipts.timeout;
        loop {
            if let Some(receipt) = self.receipt(hash).await? {
                return Ok(receipt);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(RpcError::Timeout(self.receipts.timeout.as_millis() as u64));
            }
            tokio::time::sleep(self.receipts.interval).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Hex helpers
// ---------------------------------------------------------------------------

fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn strip_0x<'a>(raw: &'a str, field: &str) -> Result<&'a str, RpcError> {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| decode_err(field, "must be 0x-prefixed hex"))
}

fn parse_hex_u64(raw: &str, field: &str) -> Result<u64, RpcError> {
    let digits = strip_0x(raw, field)?;
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16).map_err(|e| decode_err(field, &e.to_string()))
}

fn parse_hex_u256(raw: &str, field: &str) -> Result<U256, RpcError> {
    let digits = strip_0x(raw, field)?;
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).map_err(|e| decode_err(field, &e.to_string()))
}

fn parse_bytes(raw: &str, field: &str) -> Result<Bytes, RpcError> {
    let digits = strip_0x(raw, field)?;
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| decode_err(field, &e.to_string()))
}

fn parse_b256(raw: &str, field: &str) -> Result<B256, RpcError> {
    B256::from_str(raw.trim()).map_err(|e| decode_err(field, &e.to_string()))
}

fn decode_err(field: &str, message: &str) -> RpcError {
    RpcError::Decode {
        field: field.to_string(),
        message: message.to_string(),
    }
}
