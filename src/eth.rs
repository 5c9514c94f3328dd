//! Blocking Ethereum JSON-RPC client plus the async adapters the
//! orchestrator consumes.
//!
//! The client itself is synchronous; callers hop onto the blocking pool with
//! `tokio::task::spawn_blocking`, which keeps the request path simple and the
//! UI thread free.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::abi::Address;
use crate::error::VaultError;
use crate::orchestrator::{ChainReader, TxSigner};

pub struct EthRpcClient {
    http: reqwest::blocking::Client,
    url: String,
}

impl EthRpcClient {
    pub fn new(url: &str) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            url: url.to_string(),
        }
    }

    fn request(&self, method: &str, params: Value) -> Result<Value, VaultError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|e| VaultError::Http(e.to_string()))?;
        let v: Value = response
            .json()
            .map_err(|e| VaultError::Json(e.to_string()))?;
        if let Some(err) = v.get("error") {
            let msg = err["message"].as_str().unwrap_or("unknown RPC error");
            return Err(VaultError::Rpc(msg.to_string()));
        }
        Ok(v["result"].clone())
    }

    /// `eth_call` against latest state; returns the raw return data.
    pub fn call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, VaultError> {
        let result = self.request(
            "eth_call",
            json!([{ "to": to.to_string(), "data": format!("0x{}", hex::encode(data)) }, "latest"]),
        )?;
        decode_hex_result(&result)
    }

    pub fn accounts(&self) -> Result<Vec<Address>, VaultError> {
        let result = self.request("eth_accounts", json!([]))?;
        let list = result
            .as_array()
            .ok_or_else(|| VaultError::Json("eth_accounts did not return a list".into()))?;
        list.iter()
            .map(|entry| {
                let s = entry
                    .as_str()
                    .ok_or_else(|| VaultError::Json("account entry is not a string".into()))?;
                Address::from_hex(s)
            })
            .collect()
    }

    pub fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: &[u8],
    ) -> Result<String, VaultError> {
        let result = self.request(
            "eth_sendTransaction",
            json!([{
                "from": from.to_string(),
                "to": to.to_string(),
                "data": format!("0x{}", hex::encode(data)),
            }]),
        )?;
        result
            .as_str()
            .map(String::from)
            .ok_or_else(|| VaultError::Json("missing transaction hash".into()))
    }

    /// `None` while pending, `Some(success)` once mined.
    pub fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<bool>, VaultError> {
        let result = self.request("eth_getTransactionReceipt", json!([tx_hash]))?;
        if result.is_null() {
            return Ok(None);
        }
        let status = result["status"]
            .as_str()
            .ok_or_else(|| VaultError::Json("receipt missing status".into()))?;
        Ok(Some(status == "0x1"))
    }

    /// `eth_signTypedData_v4` — the typed-data document is sent as a JSON
    /// string, per the method's convention.
    pub fn sign_typed_data(&self, account: Address, typed: &Value) -> Result<String, VaultError> {
        let document =
            serde_json::to_string(typed).map_err(|e| VaultError::Json(e.to_string()))?;
        let result = self.request(
            "eth_signTypedData_v4",
            json!([account.to_string(), document]),
        )?;
        result
            .as_str()
            .map(String::from)
            .ok_or_else(|| VaultError::Json("missing signature".into()))
    }
}

fn decode_hex_result(result: &Value) -> Result<Vec<u8>, VaultError> {
    let s = result
        .as_str()
        .ok_or_else(|| VaultError::Json("expected hex string result".into()))?;
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped).map_err(|e| VaultError::Json(e.to_string()))
}

pub type SharedEthClient = Arc<EthRpcClient>;

// ---------------------------------------------------------------------------
// Orchestrator adapters
// ---------------------------------------------------------------------------

/// Read-only chain access.
#[derive(Clone)]
pub struct RpcChain {
    client: SharedEthClient,
}

impl RpcChain {
    pub fn new(client: SharedEthClient) -> Self {
        Self { client }
    }
}

impl ChainReader for RpcChain {
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, VaultError> {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || client.call(to, &data))
            .await
            .map_err(|e| VaultError::Io(e.to_string()))?
    }
}

/// Transaction signing through the connected node's wallet accounts.
#[derive(Clone)]
pub struct RpcSigner {
    client: SharedEthClient,
}

impl RpcSigner {
    pub fn new(client: SharedEthClient) -> Self {
        Self { client }
    }
}

impl TxSigner for RpcSigner {
    fn is_available(&self) -> bool {
        true
    }

    async fn sign_typed_data(
        &self,
        account: Address,
        typed_data: &Value,
    ) -> Result<String, VaultError> {
        let client = self.client.clone();
        let typed = typed_data.clone();
        tokio::task::spawn_blocking(move || client.sign_typed_data(account, &typed))
            .await
            .map_err(|e| VaultError::Io(e.to_string()))?
    }

    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Vec<u8>,
    ) -> Result<String, VaultError> {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || client.send_transaction(from, to, &data))
            .await
            .map_err(|e| VaultError::Io(e.to_string()))?
    }

    async fn wait(&self, tx_hash: &str) -> Result<(), VaultError> {
        for _ in 0..60 {
            tokio::time::sleep(Duration::from_secs(2)).await;

            let client = self.client.clone();
            let hash = tx_hash.to_string();
            let receipt = tokio::task::spawn_blocking(move || client.transaction_receipt(&hash))
                .await
                .map_err(|e| VaultError::Io(e.to_string()))??;

            match receipt {
                Some(true) => return Ok(()),
                Some(false) => return Err(VaultError::Reverted),
                None => {}
            }
        }
        Err(VaultError::Timeout)
    }
}
