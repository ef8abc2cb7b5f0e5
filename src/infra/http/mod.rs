//! Outbound HTTP: the reqwest transport and the retrying client on top of it.

pub mod reqwest_transport;
pub mod retry;

pub use reqwest_transport::ReqwestTransport;
pub use retry::{ResilientClient, RetryPolicy};
