//! Application state management.
//!
//! This module provides the shared application state that is
//! accessible to all request handlers via Axum's State extractor.

use std::sync::Arc;

use crate::domain::HttpTransport;
use crate::infra::PrometheusHandle;

use super::config::GatewayConfig;
use super::service::QueryService;

/// Shared application state for the Axum web server.
///
/// # Thread Safety
///
/// All contained types are wrapped in `Arc` and implement `Send + Sync`,
/// making `AppState` safe to share across async tasks.
///
/// # Example
///
/// ```ignore
/// let config = Arc::new(GatewayConfig::from_env()?);
/// let transport = Arc::new(ReqwestTransport::new()?);
/// let state = AppState::new(config, transport).with_metrics(init_metrics()?);
///
/// let router = create_router(Arc::new(state));
/// ```
#[derive(Clone)]
pub struct AppState {
    /// The query service containing the per-chain handlers.
    pub service: Arc<QueryService>,

    /// Prometheus handle rendered at `GET /metrics`, when a recorder is installed.
    pub metrics: Option<Arc<PrometheusHandle>>,
}

impl AppState {
    /// Creates the state, wiring the query service to `transport`.
    #[must_use]
    pub fn new(config: Arc<GatewayConfig>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            service: Arc::new(QueryService::new(config, transport)),
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(Arc::new(handle));
        self
    }
}
