use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::models::{signature_prefix, AccountBalance, BlockFetch, TxRecord};

/// Lamports per SOL; balances come back in lamports.
const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Highest transaction format version the decoder understands.
const MAX_SUPPORTED_TRANSACTION_VERSION: u8 = 0;

/// Solana RPC error codes for slots that were skipped and will never carry a
/// block. These are permanent, not retryable.
const SLOT_SKIPPED: i64 = -32007;
const LONG_TERM_STORAGE_SLOT_SKIPPED: i64 = -32009;

/// Block exists but the node has not caught up to it yet; retryable.
const BLOCK_NOT_AVAILABLE: i64 = -32004;

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    // An explicit `"result": null` must stay distinguishable from a missing
    // `result` field: null means the slot has no block, missing is a
    // malformed response. Plain `Option<Value>` collapses both to `None`.
    #[serde(default, deserialize_with = "deserialize_present_value")]
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

fn deserialize_present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// JSON-RPC client for a single Solana endpoint.
#[derive(Clone)]
pub struct RpcClient {
    client: Client,
    endpoint: String,
    commitment: String,
    timeout_seconds: u64,
}

impl RpcClient {
    pub fn new(endpoint: String, commitment: String, timeout_seconds: u64) -> Self {
        debug!("initializing RPC client for {}", endpoint);
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_seconds))
                .build()
                .expect("Failed to create HTTP client"),
            endpoint,
            commitment,
            timeout_seconds,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn make_request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: 1,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        seconds: self.timeout_seconds,
                    }
                } else if e.is_connect() {
                    ProviderError::Connection(e.to_string())
                } else {
                    ProviderError::Http(e)
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimit);
        }
        if !status.is_success() {
            return Err(ProviderError::Connection(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let rpc_response: JsonRpcResponse = response.json().await.map_err(ProviderError::Http)?;

        if let Some(error) = rpc_response.error {
            return Err(ProviderError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| ProviderError::InvalidResponse("no result in response".to_string()))
    }

    /// Current slot at the configured commitment level.
    pub async fn get_slot(&self) -> Result<u64, ProviderError> {
        let params = json!([{ "commitment": self.commitment }]);
        let result = self.make_request("getSlot", params).await?;

        result
            .as_u64()
            .ok_or_else(|| ProviderError::InvalidResponse("slot is not an integer".to_string()))
    }

    /// Fetch one slot's block and decode its transactions.
    ///
    /// A skipped slot (RPC codes -32007/-32009, or a null result) is
    /// `BlockFetch::Absent`: the provider will never produce data for it.
    /// A slot the node has not caught up to yet (-32004) is a transient
    /// error and must be retried.
    pub async fn get_block(&self, slot: u64) -> Result<BlockFetch, ProviderError> {
        let params = json!([slot, {
            "commitment": self.commitment,
            "encoding": "json",
            "transactionDetails": "full",
            "rewards": false,
            "maxSupportedTransactionVersion": MAX_SUPPORTED_TRANSACTION_VERSION,
        }]);

        let result = match self.make_request("getBlock", params).await {
            Ok(value) => value,
            Err(ProviderError::Rpc { code, message }) => {
                return match code {
                    SLOT_SKIPPED | LONG_TERM_STORAGE_SLOT_SKIPPED => {
                        debug!("slot {} was skipped: {}", slot, message);
                        Ok(BlockFetch::Absent)
                    }
                    BLOCK_NOT_AVAILABLE => Err(ProviderError::BlockNotReady { slot }),
                    _ => Err(ProviderError::Rpc { code, message }),
                };
            }
            Err(e) => return Err(e),
        };

        if result.is_null() {
            debug!("slot {} returned null block, treating as skipped", slot);
            return Ok(BlockFetch::Absent);
        }

        Ok(BlockFetch::Present(decode_block_transactions(slot, &result)))
    }
}

/// Decode the transaction list of a `getBlock` result into balance records.
///
/// Each transaction pairs its account listing (static keys plus any
/// address-table loaded accounts) with `meta.preBalances`/`meta.postBalances`
/// by index. A transaction that cannot be decoded is logged and skipped so
/// it never blinds the monitor to the rest of the block.
pub fn decode_block_transactions(slot: u64, block: &Value) -> Vec<TxRecord> {
    let raw_transactions = match block.get("transactions").and_then(|t| t.as_array()) {
        Some(txs) => txs,
        None => return Vec::new(),
    };

    let mut records = Vec::with_capacity(raw_transactions.len());
    for raw_tx in raw_transactions {
        match decode_transaction(raw_tx) {
            Some(record) => records.push(record),
            None => {
                let sig = raw_tx
                    .get("transaction")
                    .and_then(|t| t.get("signatures"))
                    .and_then(|s| s.get(0))
                    .and_then(|s| s.as_str())
                    .unwrap_or("<unknown>");
                warn!(
                    "skipping undecodable transaction in slot {}, sig {}",
                    slot,
                    signature_prefix(sig)
                );
            }
        }
    }
    records
}

fn decode_transaction(raw_tx: &Value) -> Option<TxRecord> {
    let transaction = raw_tx.get("transaction")?;
    let meta = raw_tx.get("meta")?;

    let signature = transaction
        .get("signatures")
        .and_then(|sigs| sigs.get(0))
        .and_then(|sig| sig.as_str())?
        .to_string();

    let mut accounts: Vec<String> = transaction
        .get("message")
        .and_then(|m| m.get("accountKeys"))
        .and_then(|keys| keys.as_array())
        .map(|keys| {
            keys.iter()
                .filter_map(|k| {
                    // accountKeys entries are plain strings or {"pubkey": ...}
                    // objects depending on encoding.
                    k.as_str()
                        .map(|s| s.to_string())
                        .or_else(|| k.get("pubkey").and_then(|p| p.as_str()).map(|s| s.to_string()))
                })
                .collect()
        })?;

    // Versioned transactions append looked-up addresses after the static
    // keys: writable first, then readonly. The balance arrays cover them.
    if let Some(loaded) = meta.get("loadedAddresses") {
        for section in ["writable", "readonly"] {
            if let Some(list) = loaded.get(section).and_then(|l| l.as_array()) {
                accounts.extend(list.iter().filter_map(|a| a.as_str().map(|s| s.to_string())));
            }
        }
    }

    let pre_balances: Vec<u64> = meta
        .get("preBalances")
        .and_then(|b| b.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_u64()).collect())?;
    let post_balances: Vec<u64> = meta
        .get("postBalances")
        .and_then(|b| b.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_u64()).collect())?;

    if pre_balances.len() != accounts.len() || post_balances.len() != accounts.len() {
        return None;
    }

    let balances = accounts
        .into_iter()
        .zip(pre_balances.into_iter().zip(post_balances))
        .map(|(account, (pre, post))| AccountBalance {
            account,
            pre_sol: pre as f64 / LAMPORTS_PER_SOL,
            post_sol: post as f64 / LAMPORTS_PER_SOL,
        })
        .collect();

    Some(TxRecord { signature, balances })
}
