//! Fan-out of a per-address operation over an address list.

use std::future::Future;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::domain::{AppError, BatchResponse};

/// Runs one handler call per address and gathers the results in input order.
///
/// Handlers report per-address failures inside their `Ok` value; only an
/// `Err` (an escalated upstream RPC error) aborts the batch. At most
/// `concurrency` handler calls are in flight at once.
#[derive(Debug, Clone, Copy)]
pub struct BatchExecutor {
    concurrency: usize,
}

impl BatchExecutor {
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    #[must_use]
    pub fn sequential() -> Self {
        Self::new(1)
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn run<T, F, Fut>(
        &self,
        addresses: &[String],
        handler: F,
    ) -> Result<BatchResponse<T>, AppError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        debug!(
            addresses = addresses.len(),
            concurrency = self.concurrency,
            "Running batch"
        );
        let results: Vec<T> = stream::iter(addresses.iter().cloned())
            .map(handler)
            .buffered(self.concurrency)
            .try_collect()
            .await?;
        Ok(BatchResponse::new(results))
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::sequential()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::domain::Chain;

    fn addresses(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("addr-{i}")).collect()
    }

    #[test]
    fn test_zero_concurrency_is_sequential() {
        assert_eq!(BatchExecutor::new(0).concurrency(), 1);
        assert_eq!(BatchExecutor::default().concurrency(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let batch = BatchExecutor::sequential()
            .run(&[], |a| async move { Ok::<_, AppError>(a) })
            .await
            .unwrap();

        assert_eq!(batch.count, 0);
        assert!(batch.results.is_empty());
    }

    #[tokio::test]
    async fn test_order_preserved_under_concurrency() {
        let input = addresses(8);
        let batch = BatchExecutor::new(4)
            .run(&input, |address| async move {
                let index: u64 = address.trim_start_matches("addr-").parse().unwrap();
                tokio::time::sleep(Duration::from_millis(20 - index * 2)).await;
                Ok::<_, AppError>(address)
            })
            .await
            .unwrap();

        assert_eq!(batch.count, 8);
        assert_eq!(batch.results, input);
    }

    #[tokio::test]
    async fn test_in_flight_calls_are_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let input = addresses(10);
        BatchExecutor::new(3)
            .run(&input, |address| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, AppError>(address)
                }
            })
            .await
            .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_per_item_failures_stay_in_place() {
        let input = addresses(3);
        let batch = BatchExecutor::sequential()
            .run(&input, |address| async move {
                if address == "addr-1" {
                    Ok::<_, AppError>(json!({"status": "error", "address": address}))
                } else {
                    Ok(json!({"status": "ok", "address": address}))
                }
            })
            .await
            .unwrap();

        assert_eq!(batch.count, 3);
        assert_eq!(batch.results[0]["status"], "ok");
        assert_eq!(batch.results[1]["status"], "error");
        assert_eq!(batch.results[2]["status"], "ok");
    }

    #[tokio::test]
    async fn test_escalated_error_fails_the_batch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let input = addresses(4);

        let result = BatchExecutor::sequential()
            .run(&input, |address| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if address == "addr-1" {
                        Err(AppError::UpstreamRpc {
                            chain: Chain::Eth,
                            detail: json!({"code": -32000}),
                        })
                    } else {
                        Ok(address)
                    }
                }
            })
            .await;

        assert!(matches!(result, Err(AppError::UpstreamRpc { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
