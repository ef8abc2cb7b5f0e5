//! Domain traits defining contracts for external systems.

use async_trait::async_trait;

use super::error::TransportError;
use super::types::{OutboundRequest, TransportResponse};

/// Performs a single outbound HTTP exchange.
///
/// Implementations report what happened on the wire and nothing more: any
/// status code is a successful exchange, and retrying is left to
/// [`crate::infra::ResilientClient`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError>;
}
