//! EVM node adapter (Ethereum, BSC).

use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::rpc::JsonRpcClient;
use crate::domain::amount::parse_hex_quantity;
use crate::domain::{BlockchainError, Chain, EvmTransferLog, LogRange};

/// Log record as returned by `eth_getLogs`; every field is optional.
#[derive(Debug, Deserialize)]
struct RawLog {
    #[serde(rename = "blockNumber", default)]
    block_number: Option<String>,
    #[serde(rename = "transactionHash", default)]
    transaction_hash: Option<String>,
    #[serde(rename = "logIndex", default)]
    log_index: Option<String>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    topics: Option<Vec<String>>,
    #[serde(default)]
    address: Option<String>,
}

impl From<RawLog> for EvmTransferLog {
    fn from(raw: RawLog) -> Self {
        EvmTransferLog {
            block_number: raw.block_number,
            tx_hash: raw.transaction_hash,
            log_index: raw.log_index,
            data: raw.data,
            topics: raw.topics,
            address: raw.address,
        }
    }
}

pub struct EvmClient {
    chain: Chain,
    rpc: JsonRpcClient,
}

impl EvmClient {
    pub fn new(chain: Chain, rpc: JsonRpcClient) -> Self {
        Self { chain, rpc }
    }

    /// Balance at `latest`, in wei.
    #[instrument(skip(self), fields(chain = %self.chain))]
    pub async fn get_native_balance(&self, address: &str) -> Result<u128, BlockchainError> {
        let quantity: String = self
            .rpc
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_hex_quantity(&quantity).ok_or_else(|| {
            BlockchainError::InvalidResponse(format!("expected hex quantity, got {quantity:?}"))
        })
    }

    /// `Transfer` logs emitted by `contract` inside `range`, keeping at most
    /// `range.limit_logs` of the most recent ones.
    #[instrument(skip(self, range), fields(chain = %self.chain, from = %range.from_block, to = %range.to_block))]
    pub async fn get_logs(
        &self,
        contract: &str,
        topic0: &str,
        range: &LogRange,
    ) -> Result<Vec<EvmTransferLog>, BlockchainError> {
        let filter = json!({
            "fromBlock": range.from_block,
            "toBlock": range.to_block,
            "address": contract,
            "topics": [topic0]
        });
        let logs: Option<Vec<RawLog>> = self.rpc.call("eth_getLogs", json!([filter])).await?;
        let logs = logs
            .unwrap_or_default()
            .into_iter()
            .map(EvmTransferLog::from)
            .collect();
        Ok(keep_latest(logs, range.limit_logs))
    }
}

/// Keeps the last `cap` entries, preserving their order.
pub fn keep_latest<T>(mut items: Vec<T>, cap: usize) -> Vec<T> {
    if items.len() > cap {
        items.split_off(items.len() - cap)
    } else {
        items
    }
}
