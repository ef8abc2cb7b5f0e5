//! Infrastructure layer implementations.

pub mod blockchain;
pub mod http;
pub mod observability;

pub use blockchain::{BitcoinClient, EvmClient, JsonRpcClient, RestClient, SolanaClient, TronClient};
pub use http::{ReqwestTransport, ResilientClient, RetryPolicy};
pub use observability::{LogFormat, PrometheusHandle, init_metrics, init_tracing};
