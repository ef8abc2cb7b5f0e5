//! HTTP routing configuration with per-client rate limiting.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, Response, StatusCode},
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post},
};
use governor::{
    NotUntil, Quota, RateLimiter,
    clock::{Clock, DefaultClock},
};
use tower::ServiceBuilder;
use tower_http::{
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::app::AppState;
use crate::domain::{ErrorDetail, ErrorResponse, RateLimitResponse};

use super::handlers::{
    bsc_balance_batch_handler, bsc_history_usdt_batch_handler, bsc_history_usdt_handler,
    btc_balance_batch_handler, btc_history_batch_handler, btc_history_handler,
    eth_balance_batch_handler, eth_history_usdt_batch_handler, eth_history_usdt_handler,
    liveness_handler, metrics_handler, solana_balance_batch_handler, solana_history_batch_handler,
    test_handler, tron_balance_batch_handler, tron_history_batch_handler, tron_history_handler,
    tron_history_usdt_batch_handler, tron_history_usdt_handler,
};

/// Request timeout used by [`create_router`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per second for query endpoints
    pub general_rps: u32,
    /// Burst size for query endpoints
    pub general_burst: u32,
    /// Requests per second for health endpoints
    pub health_rps: u32,
    /// Burst size for health endpoints
    pub health_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            general_rps: 10,
            general_burst: 20,
            health_rps: 100,
            health_burst: 100,
        }
    }
}

impl RateLimitConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or unparseable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str, default: u32| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            general_rps: read("RATE_LIMIT_RPS", defaults.general_rps),
            general_burst: read("RATE_LIMIT_BURST", defaults.general_burst),
            ..defaults
        }
    }
}

type KeyedLimiter = RateLimiter<
    IpAddr,
    governor::state::keyed::DashMapStateStore<IpAddr>,
    DefaultClock,
>;

/// Shared rate limiter state, keyed by client IP.
pub struct RateLimitState {
    query_limiter: KeyedLimiter,
    health_limiter: KeyedLimiter,
    config: RateLimitConfig,
}

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

impl RateLimitState {
    /// Zero rates or bursts are raised to one.
    pub fn new(config: RateLimitConfig) -> Self {
        let query_quota = Quota::per_second(non_zero(config.general_rps))
            .allow_burst(non_zero(config.general_burst));
        let health_quota = Quota::per_second(non_zero(config.health_rps))
            .allow_burst(non_zero(config.health_burst));

        Self {
            query_limiter: RateLimiter::dashmap(query_quota),
            health_limiter: RateLimiter::dashmap(health_quota),
            config,
        }
    }
}

/// Extract client IP from request (X-Forwarded-For, X-Real-IP, or ConnectInfo).
/// Unknown clients share the 0.0.0.0 bucket.
fn client_ip_from_request<B>(request: &Request<B>) -> IpAddr {
    // Client is first in X-Forwarded-For
    if let Some(ip) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }
    if let Some(ip) = request
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }
    // Present when served with into_make_service_with_connect_info
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn retry_after_secs(not_until: &NotUntil<<DefaultClock as Clock>::Instant>) -> u64 {
    let wait_time = not_until.wait_time_from(DefaultClock::default().now());
    // Sub-second waits still advertise one second.
    wait_time.as_secs().max(1)
}

/// Rate limit middleware for query endpoints
async fn rate_limit_query_middleware(
    State(rate_limit): State<Arc<RateLimitState>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let client_ip = client_ip_from_request(&request);
    let limit = HeaderValue::from(rate_limit.config.general_rps);

    match rate_limit.query_limiter.check_key(&client_ip) {
        Ok(_) => {
            let mut response = next.run(request).await;
            response.headers_mut().insert("X-RateLimit-Limit", limit);
            response
        }
        Err(not_until) => {
            let retry_after = retry_after_secs(&not_until);
            tracing::warn!(client_ip = %client_ip, retry_after, "Query rate limit exceeded");

            let body = RateLimitResponse {
                error: ErrorDetail {
                    r#type: "rate_limited".to_string(),
                    message: "Rate limit exceeded. Please slow down your requests.".to_string(),
                    detail: None,
                },
                retry_after,
            };

            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", limit);
            headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
            headers.insert("Retry-After", HeaderValue::from(retry_after));
            response
        }
    }
}

/// Rate limit middleware for health endpoints
async fn rate_limit_health_middleware(
    State(rate_limit): State<Arc<RateLimitState>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let client_ip = client_ip_from_request(&request);
    match rate_limit.health_limiter.check_key(&client_ip) {
        Ok(_) => next.run(request).await,
        Err(not_until) => {
            let retry_after = retry_after_secs(&not_until);

            let body = ErrorResponse {
                error: ErrorDetail {
                    r#type: "rate_limited".to_string(),
                    message: "Rate limit exceeded".to_string(),
                    detail: None,
                },
            };

            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            response
                .headers_mut()
                .insert("Retry-After", HeaderValue::from(retry_after));
            response
        }
    }
}

fn query_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/eth/balance_batch", post(eth_balance_batch_handler))
        .route("/eth/history_usdt", post(eth_history_usdt_handler))
        .route("/eth/history_usdt_batch", post(eth_history_usdt_batch_handler))
        .route("/bsc/balance_batch", post(bsc_balance_batch_handler))
        .route("/bsc/history_usdt", post(bsc_history_usdt_handler))
        .route("/bsc/history_usdt_batch", post(bsc_history_usdt_batch_handler))
        .route("/tron/balance_batch", post(tron_balance_batch_handler))
        .route("/tron/history", post(tron_history_handler))
        .route("/tron/history_usdt", post(tron_history_usdt_handler))
        .route("/tron/history_batch", post(tron_history_batch_handler))
        .route("/tron/history_usdt_batch", post(tron_history_usdt_batch_handler))
        .route("/btc/balance_batch", post(btc_balance_batch_handler))
        .route("/btc/history", post(btc_history_handler))
        .route("/btc/history_batch", post(btc_history_batch_handler))
        .route("/solana/balance_batch", post(solana_balance_batch_handler))
        .route("/solana/history_batch", post(solana_history_batch_handler))
}

fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/test", get(test_handler))
        .route("/health/live", get(liveness_handler))
        .route("/metrics", get(metrics_handler))
}

fn with_http_layers(router: Router<Arc<AppState>>, request_timeout: Duration) -> Router<Arc<AppState>> {
    let middleware = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ));

    router.layer(middleware)
}

/// Create router without rate limiting
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let routes = Router::new().merge(query_routes()).merge(health_routes());

    with_http_layers(routes, DEFAULT_REQUEST_TIMEOUT).with_state(app_state)
}

/// Create router with rate limiting enabled
pub fn create_router_with_rate_limit(
    app_state: Arc<AppState>,
    config: RateLimitConfig,
    request_timeout: Duration,
) -> Router {
    let rate_limit_state = Arc::new(RateLimitState::new(config));

    let query = query_routes().layer(middleware::from_fn_with_state(
        Arc::clone(&rate_limit_state),
        rate_limit_query_middleware,
    ));

    let health = health_routes().layer(middleware::from_fn_with_state(
        Arc::clone(&rate_limit_state),
        rate_limit_health_middleware,
    ));

    let routes = Router::new().merge(query).merge(health);

    with_http_layers(routes, request_timeout).with_state(app_state)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        response::IntoResponse,
        routing::get,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    use super::*;
    use crate::test_utils::{MockTransport, test_state};

    fn json_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    mod rate_limit_config_tests {
        use super::*;
        use std::collections::HashMap;

        fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
            let map: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            move |key| map.get(key).cloned()
        }

        #[test]
        fn test_rate_limit_config_default() {
            let config = RateLimitConfig::default();
            assert_eq!(config.general_rps, 10);
            assert_eq!(config.general_burst, 20);
            assert_eq!(config.health_rps, 100);
            assert_eq!(config.health_burst, 100);
        }

        #[test]
        fn test_rate_limit_config_from_lookup() {
            let config = RateLimitConfig::from_lookup(lookup(&[
                ("RATE_LIMIT_RPS", "50"),
                ("RATE_LIMIT_BURST", " 75 "),
            ]));
            assert_eq!(config.general_rps, 50);
            assert_eq!(config.general_burst, 75);
            assert_eq!(config.health_rps, 100);
        }

        #[test]
        fn test_rate_limit_config_ignores_garbage() {
            let config = RateLimitConfig::from_lookup(lookup(&[("RATE_LIMIT_RPS", "fast")]));
            assert_eq!(config.general_rps, 10);
            assert_eq!(config.general_burst, 20);
        }
    }

    mod middleware_tests {
        use super::*;
        use http_body_util::BodyExt;

        async fn dummy_handler() -> impl IntoResponse {
            StatusCode::OK
        }

        fn limited_app(config: RateLimitConfig, health: bool) -> Router {
            let state = Arc::new(RateLimitState::new(config));
            let router = Router::new().route("/", get(dummy_handler));
            if health {
                router.layer(middleware::from_fn_with_state(
                    state,
                    rate_limit_health_middleware,
                ))
            } else {
                router.layer(middleware::from_fn_with_state(
                    state,
                    rate_limit_query_middleware,
                ))
            }
        }

        fn get_root() -> Request<Body> {
            Request::builder().uri("/").body(Body::empty()).unwrap()
        }

        #[tokio::test]
        async fn test_rate_limit_success_includes_limit_header() {
            let app = limited_app(
                RateLimitConfig {
                    general_rps: 100,
                    general_burst: 100,
                    ..Default::default()
                },
                false,
            );

            let response = app.oneshot(get_root()).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers().get("X-RateLimit-Limit").unwrap(), "100");
        }

        #[tokio::test]
        async fn test_rate_limit_exceeded_includes_headers_and_body() {
            let app = limited_app(
                RateLimitConfig {
                    general_rps: 1,
                    general_burst: 1,
                    ..Default::default()
                },
                false,
            );

            app.clone().oneshot(get_root()).await.unwrap();
            let response = app.oneshot(get_root()).await.unwrap();

            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
            assert_eq!(
                response.headers().get("X-RateLimit-Remaining").unwrap(),
                "0"
            );
            assert!(response.headers().contains_key("Retry-After"));

            let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
            let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
            assert_eq!(body["error"]["type"], "rate_limited");
            assert!(body["retry_after"].as_u64().unwrap() >= 1);
        }

        #[tokio::test]
        async fn test_zero_quota_is_raised_to_one() {
            let app = limited_app(
                RateLimitConfig {
                    general_rps: 0,
                    general_burst: 0,
                    ..Default::default()
                },
                false,
            );

            let first = app.clone().oneshot(get_root()).await.unwrap();
            assert_eq!(first.status(), StatusCode::OK);
            let second = app.oneshot(get_root()).await.unwrap();
            assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        }

        #[tokio::test]
        async fn test_health_rate_limit_allows_high_volume() {
            let app = limited_app(RateLimitConfig::default(), true);

            for _ in 0..10 {
                let response = app.clone().oneshot(get_root()).await.unwrap();
                assert_eq!(response.status(), StatusCode::OK);
            }
        }

        #[tokio::test]
        async fn test_health_rate_limit_eventually_blocks() {
            let app = limited_app(
                RateLimitConfig {
                    health_rps: 1,
                    health_burst: 1,
                    ..Default::default()
                },
                true,
            );

            let response = app.clone().oneshot(get_root()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let response = app.oneshot(get_root()).await.unwrap();
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
            assert!(response.headers().contains_key("Retry-After"));
        }

        #[tokio::test]
        async fn test_rate_limit_is_per_client_ip() {
            let app = limited_app(
                RateLimitConfig {
                    general_rps: 1,
                    general_burst: 1,
                    ..Default::default()
                },
                false,
            );

            let from = |ip: &str| {
                Request::builder()
                    .uri("/")
                    .header("X-Forwarded-For", ip)
                    .body(Body::empty())
                    .unwrap()
            };

            app.clone().oneshot(from("192.168.1.1")).await.unwrap();
            let blocked = app.clone().oneshot(from("192.168.1.1")).await.unwrap();
            assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

            let other = app.oneshot(from("10.0.0.1")).await.unwrap();
            assert_eq!(other.status(), StatusCode::OK);
        }

        #[test]
        fn test_client_ip_sources() {
            let request = Request::builder()
                .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
                .body(())
                .unwrap();
            assert_eq!(
                client_ip_from_request(&request),
                "203.0.113.7".parse::<IpAddr>().unwrap()
            );

            let request = Request::builder()
                .header("x-real-ip", " 198.51.100.2 ")
                .body(())
                .unwrap();
            assert_eq!(
                client_ip_from_request(&request),
                "198.51.100.2".parse::<IpAddr>().unwrap()
            );

            let mut request = Request::builder().body(()).unwrap();
            request
                .extensions_mut()
                .insert(ConnectInfo("192.0.2.9:4000".parse::<SocketAddr>().unwrap()));
            assert_eq!(
                client_ip_from_request(&request),
                "192.0.2.9".parse::<IpAddr>().unwrap()
            );

            let request = Request::builder().body(()).unwrap();
            assert_eq!(
                client_ip_from_request(&request),
                IpAddr::V4(Ipv4Addr::UNSPECIFIED)
            );
        }
    }

    mod router_tests {
        use super::*;
        use http_body_util::BodyExt;

        #[tokio::test]
        async fn test_router_liveness() {
            let router = create_router(test_state(Arc::new(MockTransport::new())));

            let res = router
                .oneshot(
                    Request::builder()
                        .uri("/health/live")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(res.status(), StatusCode::OK);
        }

        #[tokio::test]
        async fn test_router_test_endpoint() {
            let router = create_router(test_state(Arc::new(MockTransport::new())));

            let res = router
                .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(res.status(), StatusCode::OK);
            let bytes = res.into_body().collect().await.unwrap().to_bytes();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["alive"], true);
            assert_eq!(body["provider"], "tatum+rpc");
            assert!(body["timestamp"].is_string());
        }

        #[tokio::test]
        async fn test_router_metrics_without_recorder() {
            let router = create_router(test_state(Arc::new(MockTransport::new())));

            let res = router
                .oneshot(
                    Request::builder()
                        .uri("/metrics")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(res.status(), StatusCode::NOT_FOUND);
        }

        #[tokio::test]
        async fn test_router_unknown_route() {
            let router = create_router(test_state(Arc::new(MockTransport::new())));

            let res = router
                .oneshot(json_post("/doge/balance_batch", r#"{"addresses":["x"]}"#))
                .await
                .unwrap();

            assert_eq!(res.status(), StatusCode::NOT_FOUND);
        }

        #[tokio::test]
        async fn test_router_rejects_get_on_query_route() {
            let router = create_router(test_state(Arc::new(MockTransport::new())));

            let res = router
                .oneshot(
                    Request::builder()
                        .uri("/eth/balance_batch")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        }

        #[tokio::test]
        async fn test_router_with_rate_limit_health_accessible() {
            let router = create_router_with_rate_limit(
                test_state(Arc::new(MockTransport::new())),
                RateLimitConfig::default(),
                DEFAULT_REQUEST_TIMEOUT,
            );

            let res = router
                .oneshot(
                    Request::builder()
                        .uri("/health/live")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(res.status(), StatusCode::OK);
        }

        #[tokio::test]
        async fn test_router_with_rate_limit_applies_limits() {
            let mock = Arc::new(MockTransport::new());
            let router = create_router_with_rate_limit(
                test_state(Arc::clone(&mock)),
                RateLimitConfig {
                    general_rps: 1,
                    general_burst: 1,
                    health_rps: 100,
                    health_burst: 100,
                },
                DEFAULT_REQUEST_TIMEOUT,
            );

            let body = r#"{"addresses":["not-an-address"]}"#;
            let res = router
                .clone()
                .oneshot(json_post("/eth/balance_batch", body))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            assert_eq!(res.headers().get("X-RateLimit-Limit").unwrap(), "1");

            let res = router
                .clone()
                .oneshot(json_post("/eth/balance_batch", body))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

            // Health bucket is separate.
            let res = router
                .oneshot(
                    Request::builder()
                        .uri("/health/live")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            assert_eq!(mock.call_count(), 0);
        }
    }
}
