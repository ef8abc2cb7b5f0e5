//! HTTP request handlers.
//!
//! Handlers validate the body, call into [`crate::app::QueryService`] and
//! return its envelopes as JSON. Per-address failures are part of a 200
//! response; only validation failures and escalated upstream RPC errors
//! produce error statuses.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::error;
use validator::Validate;

use crate::app::AppState;
use crate::domain::{
    AddressesRequest, AppError, BalanceResult, BatchResponse, BtcHistoryRequest, Chain,
    ErrorDetail, ErrorResponse, EvmHistoryBatchRequest, EvmHistoryRequest, EvmTransferLog,
    HistoryResult, LivenessResponse, SolanaHistoryOptions, SolanaHistoryRequest,
    SolanaTransaction, TronHistoryRequest, ValidationError,
};

/// Provider tag reported by the liveness endpoint.
pub const PROVIDER_TAG: &str = "tatum+rpc";

type BalanceBatch = Json<BatchResponse<BalanceResult>>;
type EvmHistory = Json<HistoryResult<EvmTransferLog>>;
type EvmHistoryBatch = Json<BatchResponse<HistoryResult<EvmTransferLog>>>;
type RawHistory = Json<HistoryResult<Value>>;
type RawHistoryBatch = Json<BatchResponse<HistoryResult<Value>>>;

fn first_address(addresses: &[String]) -> Result<String, AppError> {
    addresses
        .first()
        .cloned()
        .ok_or_else(|| AppError::Validation(ValidationError::MissingField("addresses".to_string())))
}

async fn balance_batch(
    state: &AppState,
    chain: Chain,
    payload: AddressesRequest,
) -> Result<BalanceBatch, AppError> {
    payload.validate()?;
    let batch = state
        .service
        .balance_batch(chain, &payload.addresses)
        .await?;
    Ok(Json(batch))
}

pub async fn eth_balance_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddressesRequest>,
) -> Result<BalanceBatch, AppError> {
    balance_batch(&state, Chain::Eth, payload).await
}

pub async fn bsc_balance_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddressesRequest>,
) -> Result<BalanceBatch, AppError> {
    balance_batch(&state, Chain::Bsc, payload).await
}

pub async fn tron_balance_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddressesRequest>,
) -> Result<BalanceBatch, AppError> {
    balance_batch(&state, Chain::Tron, payload).await
}

pub async fn btc_balance_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddressesRequest>,
) -> Result<BalanceBatch, AppError> {
    balance_batch(&state, Chain::Btc, payload).await
}

pub async fn solana_balance_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddressesRequest>,
) -> Result<BalanceBatch, AppError> {
    balance_batch(&state, Chain::Sol, payload).await
}

async fn evm_history(
    state: &AppState,
    chain: Chain,
    payload: EvmHistoryRequest,
) -> Result<EvmHistory, AppError> {
    payload.validate()?;
    let range = payload.range();
    let result = state
        .service
        .evm_usdt_history(chain, payload.address, &range)
        .await?;
    Ok(Json(result))
}

async fn evm_history_batch(
    state: &AppState,
    chain: Chain,
    payload: EvmHistoryBatchRequest,
) -> Result<EvmHistoryBatch, AppError> {
    payload.validate()?;
    let batch = state
        .service
        .evm_usdt_history_batch(chain, &payload.addresses, &payload.range())
        .await?;
    Ok(Json(batch))
}

pub async fn eth_history_usdt_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EvmHistoryRequest>,
) -> Result<EvmHistory, AppError> {
    evm_history(&state, Chain::Eth, payload).await
}

pub async fn bsc_history_usdt_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EvmHistoryRequest>,
) -> Result<EvmHistory, AppError> {
    evm_history(&state, Chain::Bsc, payload).await
}

pub async fn eth_history_usdt_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EvmHistoryBatchRequest>,
) -> Result<EvmHistoryBatch, AppError> {
    evm_history_batch(&state, Chain::Eth, payload).await
}

pub async fn bsc_history_usdt_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EvmHistoryBatchRequest>,
) -> Result<EvmHistoryBatch, AppError> {
    evm_history_batch(&state, Chain::Bsc, payload).await
}

async fn tron_history(
    state: &AppState,
    payload: TronHistoryRequest,
    usdt_only: bool,
) -> Result<RawHistory, AppError> {
    payload.validate()?;
    let address = first_address(&payload.addresses)?;
    let result = state
        .service
        .tron_history(
            address,
            payload.page_size,
            payload.next_page.as_deref(),
            usdt_only,
        )
        .await?;
    Ok(Json(result))
}

async fn tron_history_batch(
    state: &AppState,
    payload: TronHistoryRequest,
    usdt_only: bool,
) -> Result<RawHistoryBatch, AppError> {
    payload.validate()?;
    let batch = state
        .service
        .tron_history_batch(
            &payload.addresses,
            payload.page_size,
            payload.next_page.as_deref(),
            usdt_only,
        )
        .await?;
    Ok(Json(batch))
}

/// History of the first address only.
pub async fn tron_history_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TronHistoryRequest>,
) -> Result<RawHistory, AppError> {
    tron_history(&state, payload, false).await
}

/// USDT TRC-20 history of the first address only.
pub async fn tron_history_usdt_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TronHistoryRequest>,
) -> Result<RawHistory, AppError> {
    tron_history(&state, payload, true).await
}

pub async fn tron_history_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TronHistoryRequest>,
) -> Result<RawHistoryBatch, AppError> {
    tron_history_batch(&state, payload, false).await
}

pub async fn tron_history_usdt_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TronHistoryRequest>,
) -> Result<RawHistoryBatch, AppError> {
    tron_history_batch(&state, payload, true).await
}

/// History of the first address only.
pub async fn btc_history_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BtcHistoryRequest>,
) -> Result<RawHistory, AppError> {
    payload.validate()?;
    let address = first_address(&payload.addresses)?;
    let result = state
        .service
        .btc_history(address, payload.page_size, payload.offset)
        .await?;
    Ok(Json(result))
}

pub async fn btc_history_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BtcHistoryRequest>,
) -> Result<RawHistoryBatch, AppError> {
    payload.validate()?;
    let batch = state
        .service
        .btc_history_batch(&payload.addresses, payload.page_size, payload.offset)
        .await?;
    Ok(Json(batch))
}

pub async fn solana_history_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SolanaHistoryRequest>,
) -> Result<Json<BatchResponse<HistoryResult<SolanaTransaction>>>, AppError> {
    payload.validate()?;
    let options = SolanaHistoryOptions::from(&payload);
    let batch = state
        .service
        .solana_history_batch(&payload.addresses, &options)
        .await?;
    Ok(Json(batch))
}

/// Liveness with provider tag and server time.
pub async fn test_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse::new(PROVIDER_TAG))
}

/// Kubernetes liveness probe
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Prometheus text exposition.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_type, message, detail) = match &self {
            AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                self.to_string(),
                None,
            ),
            AppError::UpstreamRpc { detail, .. } => (
                StatusCode::BAD_GATEWAY,
                "upstream_rpc_error",
                self.to_string(),
                Some(detail.clone()),
            ),
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                self.to_string(),
                None,
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                self.to_string(),
                None,
            ),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Rate limit exceeded".to_string(),
                None,
            ),
        };

        if status.is_server_error() {
            error!(error_type = %error_type, message = %message, "Server error");
        }

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                r#type: error_type.to_string(),
                message,
                detail,
            },
        });

        (status, body).into_response()
    }
}
