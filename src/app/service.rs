//! Query service: per-chain handlers and their batch wrappers.
//!
//! Every handler validates the address first and returns a per-address
//! envelope without touching the network when it is malformed. Transport
//! and decoding failures become error envelopes tagged with the chain;
//! JSON-RPC `error` members escalate as [`AppError::UpstreamRpc`].

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};

use super::batch::BatchExecutor;
use super::config::{EvmToken, GatewayConfig};
use crate::domain::address::{invalid_address_message, is_valid_address};
use crate::domain::amount::{format_decimal, from_base_units};
use crate::domain::{
    AppError, BalanceResult, BatchResponse, BlockchainError, Chain, EvmTransferLog, HistoryResult,
    HttpTransport, LogRange, NativeBalance, SolanaHistoryOptions, SolanaTransaction,
};
use crate::infra::blockchain::has_spl_token_instruction;
use crate::infra::{
    BitcoinClient, EvmClient, JsonRpcClient, ResilientClient, RestClient, SolanaClient, TronClient,
};

const EVM_NATIVE_DECIMALS: u32 = 18;

/// Operation label used in metrics and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Balance,
    UsdtHistory,
    History,
}

impl Operation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Balance => "balance",
            Operation::UsdtHistory => "usdt_history",
            Operation::History => "history",
        }
    }
}

/// Prefix of the per-address error detail, e.g. `ETH RPC error`.
///
/// Solana balances come from the REST provider while Solana history goes
/// through the node, hence the two labels.
#[must_use]
pub fn error_label(chain: Chain, operation: Operation) -> String {
    let via = match (chain, operation) {
        (Chain::Eth | Chain::Bsc, _) => "RPC",
        (Chain::Sol, Operation::Balance) => "API",
        (Chain::Sol, _) => "RPC",
        (Chain::Tron | Chain::Btc, _) => "API",
    };
    format!("{} {via} error", chain.tag())
}

fn record(chain: Chain, operation: Operation, status: &'static str) {
    metrics::counter!(
        "gateway_chain_queries_total",
        "chain" => chain.as_str(),
        "operation" => operation.as_str(),
        "status" => status
    )
    .increment(1);
}

/// Splits an adapter outcome into success, a per-address error message, or
/// a request-level failure.
fn settle<T>(
    chain: Chain,
    operation: Operation,
    address: &str,
    outcome: Result<T, BlockchainError>,
) -> Result<Result<T, String>, AppError> {
    match outcome {
        Ok(value) => {
            record(chain, operation, "ok");
            Ok(Ok(value))
        }
        Err(BlockchainError::Rpc(detail)) => {
            record(chain, operation, "upstream_rpc_error");
            warn!(%chain, address, detail = %detail, "Upstream RPC error, failing request");
            Err(AppError::UpstreamRpc { chain, detail })
        }
        Err(err) => {
            record(chain, operation, "error");
            warn!(%chain, address, error = %err, "Upstream query failed");
            Ok(Err(format!("{}: {err}", error_label(chain, operation))))
        }
    }
}

/// Core multi-chain query logic, independent of HTTP.
///
/// # Example
///
/// ```ignore
/// let transport = Arc::new(ReqwestTransport::new()?);
/// let service = QueryService::new(Arc::new(GatewayConfig::from_env()?), transport);
///
/// let batch = service.balance_batch(Chain::Eth, &addresses).await?;
/// ```
pub struct QueryService {
    config: Arc<GatewayConfig>,
    eth: EvmClient,
    bsc: EvmClient,
    tron: TronClient,
    btc: BitcoinClient,
    sol: SolanaClient,
    batch: BatchExecutor,
}

impl QueryService {
    /// Wires every chain adapter to one retrying client over `transport`.
    #[must_use]
    pub fn new(config: Arc<GatewayConfig>, transport: Arc<dyn HttpTransport>) -> Self {
        let http = Arc::new(ResilientClient::new(transport, config.http.retry.clone()));
        let rpc = |url: &str| {
            JsonRpcClient::new(
                Arc::clone(&http),
                url,
                config.api_key.clone(),
                config.http.rpc_timeout,
            )
        };
        let rest = RestClient::new(
            Arc::clone(&http),
            config.endpoints.provider_api_url.as_str(),
            config.api_key.clone(),
            config.http.rest_timeout,
        );

        let eth = EvmClient::new(Chain::Eth, rpc(config.endpoints.eth_rpc_url.as_str()));
        let bsc = EvmClient::new(Chain::Bsc, rpc(config.endpoints.bsc_rpc_url.as_str()));
        let sol = SolanaClient::new(rpc(config.endpoints.sol_rpc_url.as_str()), rest.clone());
        let tron = TronClient::new(rest.clone());
        let btc = BitcoinClient::new(rest);
        let batch = BatchExecutor::new(config.batch_concurrency);

        info!(
            concurrency = batch.concurrency(),
            retries = config.http.retry.max_retries,
            "Query service ready"
        );

        Self {
            config,
            eth,
            bsc,
            tron,
            btc,
            sol,
            batch,
        }
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn evm(&self, chain: Chain) -> Result<(&EvmClient, &EvmToken), AppError> {
        match chain {
            Chain::Eth => Ok((&self.eth, &self.config.tokens.usdt_eth)),
            Chain::Bsc => Ok((&self.bsc, &self.config.tokens.usdt_bsc)),
            other => Err(AppError::Internal(format!("{other} is not an EVM chain"))),
        }
    }

    /// Native balance of one address in display units.
    #[instrument(skip(self), fields(chain = %chain))]
    pub async fn native_balance(
        &self,
        chain: Chain,
        address: String,
    ) -> Result<BalanceResult, AppError> {
        if !is_valid_address(chain, &address) {
            record(chain, Operation::Balance, "invalid_address");
            return Ok(BalanceResult::error(address, invalid_address_message(chain)));
        }

        let outcome = self.fetch_native(chain, &address).await;
        Ok(match settle(chain, Operation::Balance, &address, outcome)? {
            Ok(native) => BalanceResult::ok(address, native),
            Err(detail) => BalanceResult::error(address, detail),
        })
    }

    async fn fetch_native(
        &self,
        chain: Chain,
        address: &str,
    ) -> Result<NativeBalance, BlockchainError> {
        match chain {
            Chain::Eth | Chain::Bsc => {
                let client = if chain == Chain::Eth { &self.eth } else { &self.bsc };
                let wei = client.get_native_balance(address).await?;
                let value = from_base_units(wei, EVM_NATIVE_DECIMALS).ok_or_else(|| {
                    BlockchainError::InvalidResponse(format!("balance {wei} out of range"))
                })?;
                Ok(NativeBalance::new(chain, format_decimal(value)))
            }
            Chain::Tron => {
                let value = self.tron.get_balance(address).await?;
                Ok(NativeBalance::new(chain, format_decimal(value)))
            }
            Chain::Btc => {
                let balance = self.btc.get_balance(address).await?;
                Ok(NativeBalance::new(chain, format_decimal(balance.net)).with_raw(balance.raw))
            }
            Chain::Sol => {
                let value = self.sol.get_balance(address).await?;
                Ok(NativeBalance::new(chain, format_decimal(value)))
            }
        }
    }

    pub async fn balance_batch(
        &self,
        chain: Chain,
        addresses: &[String],
    ) -> Result<BatchResponse<BalanceResult>, AppError> {
        self.batch
            .run(addresses, |address| self.native_balance(chain, address))
            .await
    }

    /// USDT `Transfer` logs on an EVM chain.
    ///
    /// Logs are selected by token contract and event topic only; they are
    /// not narrowed to transfers involving `address`.
    #[instrument(skip(self, range), fields(chain = %chain))]
    pub async fn evm_usdt_history(
        &self,
        chain: Chain,
        address: String,
        range: &LogRange,
    ) -> Result<HistoryResult<EvmTransferLog>, AppError> {
        if !is_valid_address(chain, &address) {
            record(chain, Operation::UsdtHistory, "invalid_address");
            return Ok(HistoryResult::error(address, invalid_address_message(chain)));
        }

        let (client, token) = self.evm(chain)?;
        let outcome = client
            .get_logs(&token.contract, &token.transfer_topic, range)
            .await;
        Ok(match settle(chain, Operation::UsdtHistory, &address, outcome)? {
            Ok(logs) => HistoryResult::ok(address, logs),
            Err(detail) => HistoryResult::error(address, detail),
        })
    }

    pub async fn evm_usdt_history_batch(
        &self,
        chain: Chain,
        addresses: &[String],
        range: &LogRange,
    ) -> Result<BatchResponse<HistoryResult<EvmTransferLog>>, AppError> {
        self.batch
            .run(addresses, |address| {
                self.evm_usdt_history(chain, address, range)
            })
            .await
    }

    /// TRON account transactions, or only USDT TRC-20 transfers when
    /// `usdt_only` is set.
    #[instrument(skip(self))]
    pub async fn tron_history(
        &self,
        address: String,
        page_size: u32,
        next: Option<&str>,
        usdt_only: bool,
    ) -> Result<HistoryResult<Value>, AppError> {
        let operation = if usdt_only {
            Operation::UsdtHistory
        } else {
            Operation::History
        };
        if !is_valid_address(Chain::Tron, &address) {
            record(Chain::Tron, operation, "invalid_address");
            return Ok(HistoryResult::error(
                address,
                invalid_address_message(Chain::Tron),
            ));
        }

        let outcome = if usdt_only {
            self.tron
                .get_trc20_transactions(
                    &address,
                    &self.config.tokens.usdt_tron_contract,
                    page_size,
                    next,
                )
                .await
        } else {
            self.tron.get_transactions(&address, page_size, next).await
        };
        Ok(match settle(Chain::Tron, operation, &address, outcome)? {
            Ok(page) => HistoryResult::ok(address, page.data).with_next(page.next),
            Err(detail) => HistoryResult::error(address, detail),
        })
    }

    pub async fn tron_history_batch(
        &self,
        addresses: &[String],
        page_size: u32,
        next: Option<&str>,
        usdt_only: bool,
    ) -> Result<BatchResponse<HistoryResult<Value>>, AppError> {
        self.batch
            .run(addresses, |address| {
                self.tron_history(address, page_size, next, usdt_only)
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn btc_history(
        &self,
        address: String,
        page_size: u32,
        offset: u64,
    ) -> Result<HistoryResult<Value>, AppError> {
        if !is_valid_address(Chain::Btc, &address) {
            record(Chain::Btc, Operation::History, "invalid_address");
            return Ok(HistoryResult::error(
                address,
                invalid_address_message(Chain::Btc),
            ));
        }

        let outcome = self.btc.get_transactions(&address, page_size, offset).await;
        Ok(match settle(Chain::Btc, Operation::History, &address, outcome)? {
            Ok(transactions) => HistoryResult::ok(address, transactions),
            Err(detail) => HistoryResult::error(address, detail),
        })
    }

    pub async fn btc_history_batch(
        &self,
        addresses: &[String],
        page_size: u32,
        offset: u64,
    ) -> Result<BatchResponse<HistoryResult<Value>>, AppError> {
        self.batch
            .run(addresses, |address| self.btc_history(address, page_size, offset))
            .await
    }

    /// Recent Solana transactions of `address`.
    ///
    /// With `only_usdt` the owner's first USDT token account is queried
    /// instead, when one exists. With `only_token_transfers` transactions
    /// without an SPL Token instruction are dropped.
    #[instrument(skip(self, options))]
    pub async fn solana_history(
        &self,
        address: String,
        options: &SolanaHistoryOptions,
    ) -> Result<HistoryResult<SolanaTransaction>, AppError> {
        if !is_valid_address(Chain::Sol, &address) {
            record(Chain::Sol, Operation::History, "invalid_address");
            return Ok(HistoryResult::error(
                address,
                invalid_address_message(Chain::Sol),
            ));
        }

        let outcome = self.fetch_solana_history(&address, options).await;
        Ok(match settle(Chain::Sol, Operation::History, &address, outcome)? {
            Ok((query_address, transactions)) => HistoryResult::ok(address, transactions)
                .with_query_address(query_address)
                .with_before(options.before.clone()),
            Err(detail) => HistoryResult::error(address, detail),
        })
    }

    async fn fetch_solana_history(
        &self,
        address: &str,
        options: &SolanaHistoryOptions,
    ) -> Result<(String, Vec<SolanaTransaction>), BlockchainError> {
        let query_address = if options.only_usdt {
            self.sol
                .find_associated_token_account(address, &self.config.tokens.usdt_sol_mint)
                .await?
                .unwrap_or_else(|| address.to_string())
        } else {
            address.to_string()
        };

        let signatures = self
            .sol
            .get_signatures_for_address(&query_address, options.limit, options.before.as_deref())
            .await?;

        let mut transactions = Vec::with_capacity(signatures.len());
        for entry in signatures {
            let Some(signature) = entry.signature.filter(|s| !s.is_empty()) else {
                continue;
            };
            let tx = self.sol.get_transaction(&signature).await?;
            if options.only_token_transfers && !has_spl_token_instruction(&tx) {
                continue;
            }
            transactions.push(SolanaTransaction {
                signature,
                slot: entry.slot,
                block_time: entry.block_time,
                tx,
            });
        }
        Ok((query_address, transactions))
    }

    pub async fn solana_history_batch(
        &self,
        addresses: &[String],
        options: &SolanaHistoryOptions,
    ) -> Result<BatchResponse<HistoryResult<SolanaTransaction>>, AppError> {
        self.batch
            .run(addresses, |address| self.solana_history(address, options))
            .await
    }
}
