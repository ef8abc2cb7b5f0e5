//! Production [`HttpTransport`] backed by a pooled `reqwest` client.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::domain::{HttpMethod, HttpTransport, OutboundRequest, TransportError, TransportResponse};

/// One shared connection pool for every provider and node.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds the pooled client. Timeouts are applied per request.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        info!("Created outbound HTTP client");
        Ok(Self { client })
    }
}

fn map_send_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Connection(err.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .timeout(request.timeout)
            .send()
            .await
            .map_err(map_send_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_send_error)?;
        debug!(url = %request.url, status, bytes = body.len(), "Upstream responded");

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_transport_builds() {
        assert!(ReqwestTransport::new().is_ok());
    }

    #[tokio::test]
    async fn test_unparseable_url_is_not_transient() {
        let transport = ReqwestTransport::new().unwrap();
        let request = OutboundRequest::get("not a url", Duration::from_secs(1));

        let err = transport.send(&request).await.unwrap_err();

        assert!(!err.is_transient());
    }
}
