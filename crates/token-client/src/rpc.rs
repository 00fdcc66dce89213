//! JSON-RPC 2.0 over blocking HTTP.
//!
//! Each request is a single attempt with the configured timeout; transient
//! failures are returned to the caller as [`ChainError::Transport`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::B256;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use token_abi::Address;
use tracing::debug;

use crate::chain::{CallMessage, ChainClient, ChainError};
use crate::config::TokenConfig;
use crate::error::TokenError;
use crate::transaction::SignedTransaction;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// A [`ChainClient`] that talks to an EVM node's HTTP JSON-RPC endpoint.
pub struct HttpChainClient {
    http: Client,
    url: String,
    next_id: AtomicU64,
}

impl std::fmt::Debug for HttpChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChainClient")
            .field("url", &self.url)
            .finish()
    }
}

impl HttpChainClient {
    /// Creates a client without contacting the node.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ChainError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Creates a client for `config` and checks that the node is reachable
    /// and serves the configured chain.
    pub fn connect(config: &TokenConfig) -> Result<Self, TokenError> {
        let client = Self::new(&config.rpc_url, config.timeout())
            .map_err(|e| TokenError::Connection(e.to_string()))?;

        let chain_id = client
            .chain_id()
            .map_err(|e| TokenError::Connection(format!("{}: {e}", config.rpc_url)))?;
        if chain_id != config.chain_id {
            return Err(TokenError::Connection(format!(
                "{} serves chain {chain_id}, expected {}",
                config.rpc_url, config.chain_id
            )));
        }

        debug!(url = %config.rpc_url, chain_id, "connected to node");
        Ok(client)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the node's chain ID (`eth_chainId`).
    pub fn chain_id(&self) -> Result<u64, ChainError> {
        let result = self.request("eth_chainId", json!([]))?;
        parse_quantity(&result).and_then(to_u64)
    }

    fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, id = request.id, "rpc request");

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        interpret_response(status, &body)
    }
}

/// A JSON-RPC error object wins over the HTTP status; nodes often send one
/// with a 4xx or 5xx.
fn interpret_response(status: StatusCode, body: &str) -> Result<Value, ChainError> {
    match serde_json::from_str::<JsonRpcResponse>(body) {
        Ok(response) if response.error.is_some() => unwrap_response(response),
        _ if !status.is_success() => Err(ChainError::Transport(format!("http status {status}"))),
        Ok(response) => unwrap_response(response),
        Err(e) => Err(ChainError::InvalidResponse(e.to_string())),
    }
}

fn unwrap_response(response: JsonRpcResponse) -> Result<Value, ChainError> {
    if let Some(error) = response.error {
        return Err(ChainError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    response
        .result
        .ok_or_else(|| ChainError::InvalidResponse("response has neither result nor error".into()))
}

impl ChainClient for HttpChainClient {
    fn call(&self, message: &CallMessage) -> Result<Vec<u8>, ChainError> {
        let params = json!([
            {
                "to": format!("{:#x}", message.to),
                "data": format!("0x{}", hex::encode(&message.data)),
            },
            "latest"
        ]);
        let result = self.request("eth_call", params)?;
        parse_data(&result)
    }

    fn nonce(&self, address: &Address) -> Result<u64, ChainError> {
        let result = self.request("eth_getTransactionCount", json!([format!("{address:#x}"), "pending"]))?;
        parse_quantity(&result).and_then(to_u64)
    }

    fn gas_price(&self) -> Result<u128, ChainError> {
        let result = self.request("eth_gasPrice", json!([]))?;
        parse_quantity(&result)
    }

    fn send_raw_transaction(&self, tx: &SignedTransaction) -> Result<Option<B256>, ChainError> {
        let result = self.request("eth_sendRawTransaction", json!([tx.raw_hex()]))?;
        if result.is_null() {
            return Ok(None);
        }
        let bytes = parse_data(&result)?;
        if bytes.len() != 32 {
            return Err(ChainError::InvalidResponse(format!(
                "transaction hash has {} bytes",
                bytes.len()
            )));
        }
        Ok(Some(B256::from_slice(&bytes)))
    }
}

/// Parses a hex quantity such as `"0x1a"`.
fn parse_quantity(value: &Value) -> Result<u128, ChainError> {
    let s = value
        .as_str()
        .ok_or_else(|| ChainError::InvalidResponse(format!("expected hex quantity, got {value}")))?;
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidResponse(format!("quantity {s:?} lacks 0x prefix")))?;
    if digits.is_empty() {
        return Err(ChainError::InvalidResponse("empty quantity".into()));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("invalid quantity {s:?}: {e}")))
}

fn to_u64(value: u128) -> Result<u64, ChainError> {
    u64::try_from(value).map_err(|_| ChainError::InvalidResponse(format!("{value} exceeds u64")))
}

/// Parses hex data such as `"0x0000…"`.
fn parse_data(value: &Value) -> Result<Vec<u8>, ChainError> {
    let s = value
        .as_str()
        .ok_or_else(|| ChainError::InvalidResponse(format!("expected hex data, got {value}")))?;
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidResponse(format!("data {s:?} lacks 0x prefix")))?;
    hex::decode(digits).map_err(|e| ChainError::InvalidResponse(format!("invalid hex data: {e}")))
}
