use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chains the gateway knows how to query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Btc,
    Eth,
    Bsc,
    Tron,
    Sol,
}

impl Chain {
    /// Lowercase identifier used in payloads and metric labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Btc => "btc",
            Chain::Eth => "eth",
            Chain::Bsc => "bsc",
            Chain::Tron => "tron",
            Chain::Sol => "sol",
        }
    }

    /// Uppercase tag prefixed to upstream error messages.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Chain::Btc => "BTC",
            Chain::Eth => "ETH",
            Chain::Bsc => "BSC",
            Chain::Tron => "TRON",
            Chain::Sol => "SOL",
        }
    }

    /// Name used in address validation messages.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Chain::Sol => "Solana",
            other => other.tag(),
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One outbound HTTP exchange, independent of the client library.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub timeout: Duration,
}

impl OutboundRequest {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            timeout,
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value, timeout: Duration) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: Some(body),
            timeout,
        }
    }

    pub fn with_headers(mut self, headers: &[(String, String)]) -> Self {
        self.headers.extend(headers.iter().cloned());
        self
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Ok,
    Error,
}

/// Native-currency balance in human-readable units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NativeBalance {
    pub chain: Chain,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl NativeBalance {
    pub fn new(chain: Chain, value: String) -> Self {
        Self {
            chain,
            value,
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

/// Balance of a non-native token. Not populated by the current handlers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FungibleToken {
    pub chain: Chain,
    pub contract_or_mint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

/// Per-address balance envelope.
///
/// Built only through [`BalanceResult::ok`] and [`BalanceResult::error`] so an
/// error result never carries balances and an ok result never carries an
/// error detail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceResult {
    pub status: QueryStatus,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<NativeBalance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<FungibleToken>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl BalanceResult {
    pub fn ok(address: impl Into<String>, native: NativeBalance) -> Self {
        Self {
            status: QueryStatus::Ok,
            address: address.into(),
            native: Some(native),
            tokens: None,
            error_detail: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(address: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: QueryStatus::Error,
            address: address.into(),
            native: None,
            tokens: None,
            error_detail: Some(detail.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_tokens(mut self, tokens: Vec<FungibleToken>) -> Self {
        if self.status == QueryStatus::Ok {
            self.tokens = Some(tokens);
        }
        self
    }
}

/// Per-address history envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryResult<T> {
    pub status: QueryStatus,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<T>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// Paging cursor echoed by Solana results, serialized as `null` when
    /// the request had none. `None` for chains without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> HistoryResult<T> {
    pub fn ok(address: impl Into<String>, results: Vec<T>) -> Self {
        Self {
            status: QueryStatus::Ok,
            address: address.into(),
            count: Some(results.len()),
            results: Some(results),
            next: None,
            before: None,
            query_address: None,
            error_detail: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(address: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: QueryStatus::Error,
            address: address.into(),
            count: None,
            results: None,
            next: None,
            before: None,
            query_address: None,
            error_detail: Some(detail.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_next(mut self, next: Option<String>) -> Self {
        self.next = next;
        self
    }

    pub fn with_before(mut self, before: Option<String>) -> Self {
        self.before = Some(before);
        self
    }

    pub fn with_query_address(mut self, query_address: impl Into<String>) -> Self {
        self.query_address = Some(query_address.into());
        self
    }
}

/// Aggregate envelope for batch operations, one entry per input address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchResponse<T> {
    pub status: QueryStatus,
    pub count: usize,
    pub results: Vec<T>,
    pub timestamp: DateTime<Utc>,
}

impl<T> BatchResponse<T> {
    pub fn new(results: Vec<T>) -> Self {
        Self {
            status: QueryStatus::Ok,
            count: results.len(),
            results,
            timestamp: Utc::now(),
        }
    }
}

/// Raw ERC-20 `Transfer` log as forwarded to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvmTransferLog {
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
    #[serde(rename = "txHash")]
    pub tx_hash: Option<String>,
    #[serde(rename = "logIndex")]
    pub log_index: Option<String>,
    pub data: Option<String>,
    pub topics: Option<Vec<String>>,
    pub address: Option<String>,
}

/// Solana transaction found through a signature lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolanaTransaction {
    pub signature: String,
    pub slot: Option<u64>,
    #[serde(rename = "blockTime")]
    pub block_time: Option<i64>,
    pub tx: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub alive: bool,
    pub provider: String,
    pub timestamp: DateTime<Utc>,
}

impl LivenessResponse {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            alive: true,
            provider: provider.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub r#type: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResponse {
    pub error: ErrorDetail,
    pub retry_after: u64,
}
