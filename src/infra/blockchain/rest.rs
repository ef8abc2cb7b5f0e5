//! GET-and-decode helper for the third-party REST provider.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::domain::{BlockchainError, OutboundRequest};
use crate::infra::http::ResilientClient;

#[derive(Clone)]
pub struct RestClient {
    http: Arc<ResilientClient>,
    base_url: String,
    api_key: SecretString,
    timeout: Duration,
}

impl RestClient {
    pub fn new(
        http: Arc<ResilientClient>,
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issues a GET against `path` (relative to the base URL) and decodes
    /// the body as `T`.
    #[instrument(skip(self, query))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, BlockchainError> {
        let mut request = OutboundRequest::get(self.url(path), self.timeout).with_headers(&[
            (
                "x-api-key".to_string(),
                self.api_key.expose_secret().to_string(),
            ),
            ("accept".to_string(), "application/json".to_string()),
        ]);
        for (key, value) in query {
            request = request.with_query(key, value);
        }

        let response = self.http.call(&request).await?;
        Ok(serde_json::from_str(&response.body)?)
    }
}
