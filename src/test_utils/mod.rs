//! Test utilities and mock implementations.
//!
//! This module provides a scripted transport and ready-made configuration
//! for use in unit and integration tests.

pub mod mocks;

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::app::config::{EndpointConfig, GatewayConfig, HttpSettings, TokenRegistry};
use crate::app::AppState;
use crate::infra::RetryPolicy;

pub use mocks::{MockMatcher, MockReply, MockTransport};

pub const ETH_RPC: &str = "http://eth.mock";
pub const BSC_RPC: &str = "http://bsc.mock";
pub const SOL_RPC: &str = "http://sol.mock";
pub const PROVIDER_API: &str = "http://provider.mock/v3";

/// Configuration pointing every chain at mock hosts, with retries that
/// never sleep.
#[must_use]
pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        api_key: SecretString::from("test-api-key"),
        endpoints: EndpointConfig {
            eth_rpc_url: ETH_RPC.to_string(),
            bsc_rpc_url: BSC_RPC.to_string(),
            sol_rpc_url: SOL_RPC.to_string(),
            provider_api_url: PROVIDER_API.to_string(),
        },
        tokens: TokenRegistry::default(),
        http: HttpSettings {
            retry: RetryPolicy::immediate(2),
            rest_timeout: Duration::from_secs(20),
            rpc_timeout: Duration::from_secs(25),
        },
        batch_concurrency: 1,
    }
}

/// Application state wired to `transport`.
#[must_use]
pub fn test_state(transport: Arc<MockTransport>) -> Arc<AppState> {
    Arc::new(AppState::new(Arc::new(test_config()), transport))
}
