//! Bounded retry with exponential backoff over an [`HttpTransport`].

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument, warn};

use crate::domain::{HttpTransport, OutboundRequest, TransportError, TransportResponse};

/// Retry settings shared by every outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each following one.
    pub backoff_base: Duration,
    /// Adds a uniform random delay in `[0, backoff_base)` to every wait.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base: Duration::from_millis(700),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps, used by tests.
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_base: Duration::ZERO,
            jitter: false,
        }
    }

    /// Delay before retry `attempt` (1-indexed): `backoff_base * 2^(attempt - 1)`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.backoff_base.saturating_mul(1u32 << exponent);
        let span = self.backoff_base.as_millis() as u64;
        if self.jitter && span > 0 {
            let extra = rand::thread_rng().gen_range(0..span);
            delay.saturating_add(Duration::from_millis(extra))
        } else {
            delay
        }
    }
}

/// Outbound client that retries transient failures.
///
/// Retries on 5xx responses, timeouts and connection failures. A 4xx
/// response is returned as [`TransportError::Status`] immediately. Once the
/// retries are spent the last failure is returned, with a final 5xx
/// reported as a status error.
pub struct ResilientClient {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl ResilientClient {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    #[instrument(skip(self, request), fields(url = %request.url))]
    pub async fn call(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        let mut attempt = 0u32;
        loop {
            match self.transport.send(request).await {
                Ok(response) if response.is_success() => {
                    metrics::counter!("gateway_upstream_requests_total", "outcome" => "success")
                        .increment(1);
                    return Ok(response);
                }
                Ok(response) if response.is_server_error() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    warn!(status = response.status, attempt, "Upstream returned server error, retrying");
                }
                Ok(response) => {
                    metrics::counter!("gateway_upstream_requests_total", "outcome" => "status")
                        .increment(1);
                    debug!(status = response.status, "Upstream returned non-success status");
                    return Err(TransportError::Status {
                        status: response.status,
                        url: request.url.clone(),
                    });
                }
                Err(err) if err.is_transient() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    warn!(error = %err, attempt, "Transient transport failure, retrying");
                }
                Err(err) => {
                    metrics::counter!("gateway_upstream_requests_total", "outcome" => "failure")
                        .increment(1);
                    return Err(err);
                }
            }

            metrics::counter!("gateway_upstream_retries_total").increment(1);
            let delay = self.policy.backoff_delay(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
