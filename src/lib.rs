//! Multichain Gateway
//!
//! An HTTP gateway answering balance and transaction-history queries for
//! Ethereum, BNB Smart Chain, TRON, Bitcoin and Solana addresses. Provider
//! REST endpoints and JSON-RPC nodes are queried behind a single retrying
//! transport, and their responses are normalized into uniform per-address
//! envelopes.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                   API Layer                  │
//! │   Routes, request validation, rate limits    │
//! ├─────────────────────────────────────────────┤
//! │               Application Layer              │
//! │   Config, per-chain query handlers, batches  │
//! ├─────────────────────────────────────────────┤
//! │                 Domain Layer                 │
//! │  Types, errors, address rules, amount math   │
//! ├─────────────────────────────────────────────┤
//! │             Infrastructure Layer             │
//! │  HTTP transport, retries, chain adapters     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Every outbound exchange goes through the [`domain::HttpTransport`] trait,
//! so the whole stack runs against [`test_utils::MockTransport`] in tests.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use multichain_gateway::api::create_router;
//! use multichain_gateway::app::{AppState, GatewayConfig};
//! use multichain_gateway::infra::ReqwestTransport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(GatewayConfig::from_env()?);
//!     let transport = Arc::new(ReqwestTransport::new()?);
//!     let state = Arc::new(AppState::new(config, transport));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, create_router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod domain;
pub mod infra;

// Shared by unit tests, the integration tests in tests/ and benchmarks.
#[doc(hidden)]
pub mod test_utils;
