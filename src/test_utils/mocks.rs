//! Mock implementations for testing.
//!
//! [`MockTransport`] replaces the network: tests register scripted replies
//! keyed on the URL, the JSON-RPC method or a fragment of the request body,
//! and afterwards inspect every request the code under test made.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{HttpTransport, OutboundRequest, TransportError, TransportResponse};

/// What a scripted route hands back for one request.
pub type MockReply = Result<TransportResponse, TransportError>;

/// Selects the requests a route answers. Every populated field must match.
#[derive(Debug, Clone, Default)]
pub struct MockMatcher {
    pub url_contains: Option<String>,
    pub rpc_method: Option<String>,
    pub body_contains: Option<String>,
}

impl MockMatcher {
    pub fn url(fragment: impl Into<String>) -> Self {
        Self {
            url_contains: Some(fragment.into()),
            ..Self::default()
        }
    }

    pub fn rpc(method: impl Into<String>) -> Self {
        Self {
            rpc_method: Some(method.into()),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, fragment: impl Into<String>) -> Self {
        self.body_contains = Some(fragment.into());
        self
    }

    fn matches(&self, request: &OutboundRequest) -> bool {
        if let Some(fragment) = &self.url_contains {
            if !request.url.contains(fragment.as_str()) {
                return false;
            }
        }
        if let Some(method) = &self.rpc_method {
            let called = request
                .body
                .as_ref()
                .and_then(|body| body.get("method"))
                .and_then(Value::as_str);
            if called != Some(method.as_str()) {
                return false;
            }
        }
        if let Some(fragment) = &self.body_contains {
            let body = request
                .body
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_default();
            if !body.contains(fragment.as_str()) {
                return false;
            }
        }
        true
    }
}

struct MockRoute {
    matcher: MockMatcher,
    replies: VecDeque<MockReply>,
}

impl MockRoute {
    /// Pops scripted replies in order; the last one repeats forever.
    fn next_reply(&mut self) -> MockReply {
        if self.replies.len() > 1 {
            if let Some(reply) = self.replies.pop_front() {
                return reply;
            }
        }
        self.replies
            .front()
            .cloned()
            .unwrap_or_else(|| Err(TransportError::Connection("empty mock route".to_string())))
    }
}

/// Scripted [`HttpTransport`] that records every request.
///
/// Routes registered later take precedence, so a test can install a general
/// reply first and then override it for a single address.
///
/// # Example
///
/// ```
/// use multichain_gateway::test_utils::MockTransport;
/// use serde_json::json;
///
/// let mock = MockTransport::new();
/// mock.respond_rpc("eth_getBalance", json!("0xde0b6b3a7640000"));
/// mock.respond_json("/tron/account/", json!({"balance": 5}));
/// assert_eq!(mock.call_count(), 0);
/// ```
pub struct MockTransport {
    routes: Mutex<Vec<MockRoute>>,
    requests: Mutex<Vec<OutboundRequest>>,
    call_count: AtomicU64,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicU64::new(0),
        }
    }

    /// Registers a route answering with `replies` in order.
    pub fn route(&self, matcher: MockMatcher, replies: Vec<MockReply>) {
        self.routes.lock().unwrap().push(MockRoute {
            matcher,
            replies: replies.into(),
        });
    }

    pub fn respond_json(&self, url_fragment: &str, body: Value) {
        self.respond_status(url_fragment, 200, &body.to_string());
    }

    pub fn respond_status(&self, url_fragment: &str, status: u16, body: &str) {
        self.route(
            MockMatcher::url(url_fragment),
            vec![Ok(TransportResponse::new(status, body))],
        );
    }

    pub fn respond_sequence(&self, url_fragment: &str, replies: Vec<MockReply>) {
        self.route(MockMatcher::url(url_fragment), replies);
    }

    pub fn fail(&self, url_fragment: &str, error: TransportError) {
        self.route(MockMatcher::url(url_fragment), vec![Err(error)]);
    }

    /// Answers a JSON-RPC method with a successful envelope.
    pub fn respond_rpc(&self, method: &str, result: Value) {
        self.route(MockMatcher::rpc(method), vec![Ok(rpc_result(result))]);
    }

    /// Answers a JSON-RPC method whose params contain `param_fragment`.
    pub fn respond_rpc_for(&self, method: &str, param_fragment: &str, result: Value) {
        self.route(
            MockMatcher::rpc(method).with_body(param_fragment),
            vec![Ok(rpc_result(result))],
        );
    }

    /// Answers a JSON-RPC method with an `error` envelope.
    pub fn respond_rpc_error(&self, method: &str, error: Value) {
        let body = json!({"jsonrpc": "2.0", "id": 1, "error": error});
        self.route(
            MockMatcher::rpc(method),
            vec![Ok(TransportResponse::new(200, body.to_string()))],
        );
    }

    /// Fails a JSON-RPC method at the transport level for matching params.
    pub fn fail_rpc_for(&self, method: &str, param_fragment: &str, error: TransportError) {
        self.route(
            MockMatcher::rpc(method).with_body(param_fragment),
            vec![Err(error)],
        );
    }

    /// Total number of requests received.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests sent to URLs containing `fragment`.
    pub fn requests_to(&self, fragment: &str) -> Vec<OutboundRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.contains(fragment))
            .collect()
    }

    /// JSON-RPC requests for `method`.
    pub fn rpc_requests(&self, method: &str) -> Vec<OutboundRequest> {
        self.requests()
            .into_iter()
            .filter(|r| {
                r.body
                    .as_ref()
                    .and_then(|b| b.get("method"))
                    .and_then(Value::as_str)
                    == Some(method)
            })
            .collect()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().unwrap().push(request.clone());

        let mut routes = self.routes.lock().unwrap();
        match routes
            .iter_mut()
            .rev()
            .find(|route| route.matcher.matches(request))
        {
            Some(route) => route.next_reply(),
            None => Err(TransportError::Connection(format!(
                "no mock route for {}",
                request.url
            ))),
        }
    }
}

fn rpc_result(result: Value) -> TransportResponse {
    let body = json!({"jsonrpc": "2.0", "id": 1, "result": result});
    TransportResponse::new(200, body.to_string())
}
