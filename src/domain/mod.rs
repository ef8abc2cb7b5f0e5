//! Domain layer containing core types, traits, validators and error definitions.

pub mod address;
pub mod amount;
pub mod error;
pub mod requests;
pub mod traits;
pub mod types;

pub use error::{AppError, BlockchainError, ConfigError, TransportError, ValidationError};
pub use requests::{
    AddressesRequest, BtcHistoryRequest, EvmHistoryBatchRequest, EvmHistoryRequest, LogRange,
    SolanaHistoryOptions, SolanaHistoryRequest, TronHistoryRequest,
};
pub use traits::HttpTransport;
pub use types::{
    BalanceResult, BatchResponse, Chain, ErrorDetail, ErrorResponse, EvmTransferLog,
    FungibleToken, HistoryResult, HttpMethod, LivenessResponse, NativeBalance, OutboundRequest,
    QueryStatus, RateLimitResponse, SolanaTransaction, TransportResponse,
};
