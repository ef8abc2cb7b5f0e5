//! Request bodies accepted by the HTTP layer.

use serde::{Deserialize, Serialize};
use validator::Validate;

const BLOCK_TAGS: [&str; 5] = ["latest", "earliest", "pending", "safe", "finalized"];

fn default_from_block() -> String {
    "0x0".to_string()
}

fn default_to_block() -> String {
    "latest".to_string()
}

fn default_limit_logs() -> usize {
    2000
}

fn default_page_size() -> u32 {
    50
}

fn default_solana_limit() -> u32 {
    20
}

/// Accepts a named block tag or a `0x`-prefixed hex block number.
#[allow(clippy::ptr_arg)]
fn validate_block_tag(value: &String) -> Result<(), validator::ValidationError> {
    let is_hex = value
        .strip_prefix("0x")
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()));
    if is_hex || BLOCK_TAGS.contains(&value.as_str()) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("block_tag"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddressesRequest {
    #[validate(length(min = 1, max = 100))]
    pub addresses: Vec<String>,
}

impl AddressesRequest {
    pub fn new(addresses: Vec<String>) -> Self {
        Self { addresses }
    }
}

/// Block range shared by the single and batch EVM history requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRange {
    pub from_block: String,
    pub to_block: String,
    pub limit_logs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EvmHistoryRequest {
    pub address: String,
    #[serde(default = "default_from_block")]
    #[validate(custom(function = "validate_block_tag"))]
    pub from_block: String,
    #[serde(default = "default_to_block")]
    #[validate(custom(function = "validate_block_tag"))]
    pub to_block: String,
    #[serde(default = "default_limit_logs")]
    #[validate(range(min = 1, max = 5000))]
    pub limit_logs: usize,
}

impl EvmHistoryRequest {
    pub fn range(&self) -> LogRange {
        LogRange {
            from_block: self.from_block.clone(),
            to_block: self.to_block.clone(),
            limit_logs: self.limit_logs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EvmHistoryBatchRequest {
    #[validate(length(min = 1, max = 100))]
    pub addresses: Vec<String>,
    #[serde(default = "default_from_block")]
    #[validate(custom(function = "validate_block_tag"))]
    pub from_block: String,
    #[serde(default = "default_to_block")]
    #[validate(custom(function = "validate_block_tag"))]
    pub to_block: String,
    #[serde(default = "default_limit_logs")]
    #[validate(range(min = 1, max = 5000))]
    pub limit_logs: usize,
}

impl EvmHistoryBatchRequest {
    pub fn range(&self) -> LogRange {
        LogRange {
            from_block: self.from_block.clone(),
            to_block: self.to_block.clone(),
            limit_logs: self.limit_logs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TronHistoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub addresses: Vec<String>,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 200))]
    pub page_size: u32,
    #[serde(default)]
    pub next_page: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BtcHistoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub addresses: Vec<String>,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 200))]
    pub page_size: u32,
    #[serde(default)]
    pub offset: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SolanaHistoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub addresses: Vec<String>,
    #[serde(default = "default_solana_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u32,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub only_token_transfers: bool,
    #[serde(default)]
    pub only_usdt: bool,
}

/// Options applied to every address of a Solana history request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolanaHistoryOptions {
    pub limit: u32,
    pub before: Option<String>,
    pub only_token_transfers: bool,
    pub only_usdt: bool,
}

impl From<&SolanaHistoryRequest> for SolanaHistoryOptions {
    fn from(request: &SolanaHistoryRequest) -> Self {
        Self {
            limit: request.limit,
            before: request.before.clone(),
            only_token_transfers: request.only_token_transfers,
            only_usdt: request.only_usdt,
        }
    }
}
