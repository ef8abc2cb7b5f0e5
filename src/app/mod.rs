//! Application layer: configuration, query handlers, batching and shared state.

pub mod batch;
pub mod config;
pub mod service;
pub mod state;

pub use batch::BatchExecutor;
pub use config::{GatewayConfig, ServerConfig, TokenRegistry};
pub use service::{Operation, QueryService};
pub use state::AppState;
