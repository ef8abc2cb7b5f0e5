//! Immutable gateway configuration, read once at startup.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::domain::ConfigError;
use crate::infra::RetryPolicy;

pub const DEFAULT_PROVIDER_API_URL: &str = "https://api.tatum.io/v3";
pub const DEFAULT_ETH_RPC_URL: &str = "https://ethereum-mainnet.gateway.tatum.io";
pub const DEFAULT_BSC_RPC_URL: &str = "https://bsc-mainnet.gateway.tatum.io";
pub const DEFAULT_SOL_RPC_URL: &str = "https://solana-mainnet.gateway.tatum.io";

/// ERC-20 `Transfer(address,address,uint256)` event signature.
pub const ERC20_TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub eth_rpc_url: String,
    pub bsc_rpc_url: String,
    pub sol_rpc_url: String,
    pub provider_api_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            eth_rpc_url: DEFAULT_ETH_RPC_URL.to_string(),
            bsc_rpc_url: DEFAULT_BSC_RPC_URL.to_string(),
            sol_rpc_url: DEFAULT_SOL_RPC_URL.to_string(),
            provider_api_url: DEFAULT_PROVIDER_API_URL.to_string(),
        }
    }
}

/// An ERC-20 style token on an EVM chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmToken {
    pub contract: String,
    pub decimals: u8,
    pub transfer_topic: String,
}

/// USDT deployments queried by the history handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRegistry {
    pub usdt_eth: EvmToken,
    pub usdt_bsc: EvmToken,
    pub usdt_tron_contract: String,
    pub usdt_tron_decimals: u8,
    pub usdt_sol_mint: String,
    pub usdt_sol_decimals: u8,
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self {
            usdt_eth: EvmToken {
                contract: "0xdAC17F958D2ee523a2206206994597C13D831ec7".to_string(),
                decimals: 6,
                transfer_topic: ERC20_TRANSFER_TOPIC.to_string(),
            },
            usdt_bsc: EvmToken {
                contract: "0x55d398326f99059fF775485246999027B3197955".to_string(),
                decimals: 6,
                transfer_topic: ERC20_TRANSFER_TOPIC.to_string(),
            },
            usdt_tron_contract: "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t".to_string(),
            usdt_tron_decimals: 6,
            usdt_sol_mint: "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB".to_string(),
            usdt_sol_decimals: 6,
        }
    }
}

/// Outbound call settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    pub retry: RetryPolicy,
    pub rest_timeout: Duration,
    pub rpc_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            rest_timeout: Duration::from_secs(20),
            rpc_timeout: Duration::from_secs(25),
        }
    }
}

/// Everything the query layer needs. Built once and shared behind `Arc`.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_key: SecretString,
    pub endpoints: EndpointConfig,
    pub tokens: TokenRegistry,
    pub http: HttpSettings,
    /// Addresses processed at once within a batch; 1 is strictly sequential.
    pub batch_concurrency: usize,
}

impl GatewayConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("TATUM_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("TATUM_API_KEY".to_string()))?;

        let defaults = EndpointConfig::default();
        let endpoints = EndpointConfig {
            eth_rpc_url: lookup("ETH_RPC_URL").unwrap_or(defaults.eth_rpc_url),
            bsc_rpc_url: lookup("BSC_RPC_URL").unwrap_or(defaults.bsc_rpc_url),
            sol_rpc_url: lookup("SOL_RPC_URL").unwrap_or(defaults.sol_rpc_url),
            provider_api_url: lookup("PROVIDER_API_URL").unwrap_or(defaults.provider_api_url),
        };

        let retry = RetryPolicy {
            max_retries: parse_or(&lookup, "HTTP_RETRIES", 2u32)?,
            backoff_base: Duration::from_millis(parse_or(&lookup, "HTTP_BACKOFF_MS", 700u64)?),
            jitter: parse_or(&lookup, "HTTP_RETRY_JITTER", false)?,
        };
        let http = HttpSettings {
            retry,
            rest_timeout: Duration::from_secs(parse_or(&lookup, "REST_TIMEOUT_SECS", 20u64)?),
            rpc_timeout: Duration::from_secs(parse_or(&lookup, "RPC_TIMEOUT_SECS", 25u64)?),
        };

        let batch_concurrency: usize = parse_or(&lookup, "BATCH_CONCURRENCY", 1)?;
        if batch_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "BATCH_CONCURRENCY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            api_key: SecretString::from(api_key),
            endpoints,
            tokens: TokenRegistry::default(),
            http,
            batch_concurrency,
        })
    }
}

/// HTTP server settings, separate from the query configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
        })
    }
}

/// Parses `key` when set, else returns `default`.
pub(crate) fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                })
        }
        _ => Ok(default),
    }
}
