//! JSON-RPC 2.0 envelope handling shared by the EVM and Solana adapters.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::domain::{BlockchainError, OutboundRequest};
use crate::infra::http::ResilientClient;

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<Value>,
}

/// Posts JSON-RPC calls to one node endpoint.
#[derive(Clone)]
pub struct JsonRpcClient {
    http: Arc<ResilientClient>,
    url: String,
    api_key: SecretString,
    timeout: Duration,
}

impl JsonRpcClient {
    pub fn new(
        http: Arc<ResilientClient>,
        url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            api_key,
            timeout,
        }
    }

    /// Calls `method` and decodes the `result` member.
    ///
    /// The `error` member is inspected first; when present the raw object is
    /// returned as [`BlockchainError::Rpc`]. A `null` result decodes only
    /// into types that accept it, such as `Option<T>`.
    #[instrument(skip(self, params), fields(url = %self.url))]
    pub async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<R, BlockchainError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });
        let request = OutboundRequest::post_json(&self.url, payload, self.timeout).with_headers(&[
            (
                "x-api-key".to_string(),
                self.api_key.expose_secret().to_string(),
            ),
            ("content-type".to_string(), "application/json".to_string()),
        ]);

        let response = self.http.call(&request).await?;
        let envelope: JsonRpcResponse = serde_json::from_str(&response.body)?;

        if let Some(error) = envelope.error {
            warn!(method, error = %error, "Node rejected RPC call");
            return Err(BlockchainError::Rpc(error));
        }

        debug!(method, "RPC call succeeded");
        Ok(serde_json::from_value(envelope.result)?)
    }
}
