//! Application error types with proper error chaining.

use thiserror::Error;

use super::types::Chain;

/// Failure of a single outbound HTTP exchange after the retry policy ran out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("HTTP {status} returned by {url}")]
    Status { status: u16, url: String },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Timeouts and connection failures are worth another attempt.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connection(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockchainError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The JSON-RPC envelope carried an `error` member.
    #[error("upstream RPC error: {0}")]
    Rpc(serde_json::Value),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::InvalidResponse(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Validation failed: {0}")]
    Multiple(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// An EVM or Solana node rejected the call. Escalated to the request
    /// boundary instead of being folded into a per-address result.
    #[error("{} upstream RPC error", chain.tag())]
    UpstreamRpc {
        chain: Chain,
        detail: serde_json::Value,
    },
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Rate limit exceeded")]
    RateLimited,
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(ValidationError::Multiple(err.to_string()))
    }
}
