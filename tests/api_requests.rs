//! Request validation and routing flows.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use multichain_gateway::api::{RateLimitConfig, create_router, create_router_with_rate_limit};
use multichain_gateway::app::AppState;
use multichain_gateway::domain::ErrorResponse;
use multichain_gateway::test_utils::{MockTransport, test_config, test_state};

const ETH_ADDR: &str = "0x00000000219ab540356cBB839Cbe05303d7705Fa";
const SOL_ADDR: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn expect_validation_error(router: Router, uri: &str, body: Value) {
    let response = router.oneshot(post_json(uri, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");

    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let error: ErrorResponse = serde_json::from_slice(&body_bytes).unwrap();
    assert_eq!(error.error.r#type, "validation_error", "{uri}");
}

#[tokio::test]
async fn test_empty_address_list_rejected_everywhere() {
    let mock = Arc::new(MockTransport::new());
    let router = create_router(test_state(Arc::clone(&mock)));

    let routes = [
        "/eth/balance_batch",
        "/bsc/balance_batch",
        "/tron/balance_batch",
        "/btc/balance_batch",
        "/solana/balance_batch",
        "/eth/history_usdt_batch",
        "/bsc/history_usdt_batch",
        "/tron/history",
        "/tron/history_usdt",
        "/tron/history_batch",
        "/tron/history_usdt_batch",
        "/btc/history",
        "/btc/history_batch",
        "/solana/history_batch",
    ];
    for uri in routes {
        expect_validation_error(router.clone(), uri, json!({"addresses": []})).await;
    }

    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_oversized_batch_rejected() {
    let router = create_router(test_state(Arc::new(MockTransport::new())));
    let addresses: Vec<String> = (0..101).map(|_| ETH_ADDR.to_string()).collect();

    expect_validation_error(
        router,
        "/eth/balance_batch",
        json!({"addresses": addresses}),
    )
    .await;
}

#[tokio::test]
async fn test_paging_bounds_enforced() {
    let router = create_router(test_state(Arc::new(MockTransport::new())));

    expect_validation_error(
        router.clone(),
        "/tron/history_batch",
        json!({"addresses": ["T"], "page_size": 0}),
    )
    .await;
    expect_validation_error(
        router.clone(),
        "/btc/history_batch",
        json!({"addresses": ["bc1"], "page_size": 201}),
    )
    .await;
    expect_validation_error(
        router.clone(),
        "/solana/history_batch",
        json!({"addresses": [SOL_ADDR], "limit": 101}),
    )
    .await;
    expect_validation_error(
        router,
        "/eth/history_usdt",
        json!({"address": ETH_ADDR, "limit_logs": 5001}),
    )
    .await;
}

#[tokio::test]
async fn test_block_tags_validated() {
    let mock = Arc::new(MockTransport::new());
    mock.respond_rpc("eth_getLogs", json!([]));
    let router = create_router(test_state(Arc::clone(&mock)));

    expect_validation_error(
        router.clone(),
        "/eth/history_usdt",
        json!({"address": ETH_ADDR, "from_block": "yesterday"}),
    )
    .await;
    expect_validation_error(
        router.clone(),
        "/bsc/history_usdt_batch",
        json!({"addresses": [ETH_ADDR], "to_block": "0x"}),
    )
    .await;
    assert_eq!(mock.call_count(), 0);

    for tag in ["latest", "earliest", "pending", "safe", "finalized", "0x1b4"] {
        let response = router
            .clone()
            .oneshot(post_json(
                "/eth/history_usdt",
                json!({"address": ETH_ADDR, "to_block": tag}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{tag}");
    }
}

#[tokio::test]
async fn test_history_defaults_applied() {
    let mock = Arc::new(MockTransport::new());
    mock.respond_json("/tron/transaction/account/", json!({"data": []}));
    mock.respond_json("/bitcoin/transaction/address/", json!([]));
    mock.respond_rpc("getSignaturesForAddress", json!([]));
    let router = create_router(test_state(Arc::clone(&mock)));

    for (uri, address) in [
        ("/tron/history_batch", "TLa2f6VPqDgRE67v1736s7bJ8Ray5wYjU7"),
        (
            "/btc/history_batch",
            "bc1qgdjqv0av3q56jvd82tkdjpy7gdp9ut8tlqmgrpmv24sq90ecnvqqjwvw97",
        ),
        ("/solana/history_batch", SOL_ADDR),
    ] {
        let response = router
            .clone()
            .oneshot(post_json(uri, json!({"addresses": [address]})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }

    let has = |fragment: &str, key: &str, value: &str| {
        let requests = mock.requests_to(fragment);
        requests[0]
            .query
            .iter()
            .any(|(k, v)| k == key && v == value)
    };
    assert!(has("/tron/transaction/account/", "pageSize", "50"));
    assert!(has("/bitcoin/transaction/address/", "pageSize", "50"));
    assert!(has("/bitcoin/transaction/address/", "offset", "0"));

    let requests = mock.rpc_requests("getSignaturesForAddress");
    let params = &requests[0].body.as_ref().unwrap()["params"];
    assert_eq!(params[1], json!({"limit": 20}));
}

#[tokio::test]
async fn test_malformed_body_is_client_error() {
    let router = create_router(test_state(Arc::new(MockTransport::new())));

    let request = Request::builder()
        .method("POST")
        .uri("/eth/balance_batch")
        .header("Content-Type", "application/json")
        .body(Body::from("{\"addresses\": ["))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());

    let response = router
        .oneshot(post_json("/eth/balance_batch", json!({"wallets": [ETH_ADDR]})))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_concurrent_batches_preserve_order() {
    let mock = Arc::new(MockTransport::new());
    mock.respond_rpc("eth_getBalance", json!("0x0"));
    mock.respond_rpc_for(
        "eth_getBalance",
        "0x0000000000000000000000000000000000000002",
        json!("0xDE0B6B3A7640000"),
    );

    let mut config = test_config();
    config.batch_concurrency = 4;
    let state = Arc::new(AppState::new(Arc::new(config), mock.clone()));
    let router = create_router(state);

    let addresses: Vec<String> = (1..=6).map(|i| format!("0x{:040x}", i)).collect();
    let response = router
        .oneshot(post_json("/eth/balance_batch", json!({"addresses": addresses})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap();
    assert_eq!(body["count"], 6);
    for (i, address) in addresses.iter().enumerate() {
        assert_eq!(body["results"][i]["address"], address.as_str());
    }
    assert_eq!(body["results"][1]["native"]["value"], "1.0");
    assert_eq!(body["results"][0]["native"]["value"], "0.0");
    assert_eq!(mock.call_count(), 6);
}

#[tokio::test]
async fn test_rate_limited_router_end_to_end() {
    let mock = Arc::new(MockTransport::new());
    mock.respond_rpc("eth_getBalance", json!("0x0"));
    let router = create_router_with_rate_limit(
        test_state(Arc::clone(&mock)),
        RateLimitConfig {
            general_rps: 1,
            general_burst: 2,
            health_rps: 100,
            health_burst: 100,
        },
        std::time::Duration::from_secs(5),
    );

    let request = || {
        let mut request = post_json("/eth/balance_batch", json!({"addresses": [ETH_ADDR]}));
        request
            .headers_mut()
            .insert("x-forwarded-for", "203.0.113.5".parse().unwrap());
        request
    };

    for _ in 0..2 {
        let response = router.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = router.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("Retry-After"));

    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap();
    assert_eq!(body["error"]["type"], "rate_limited");

    // Upstream saw only the admitted requests.
    assert_eq!(mock.call_count(), 2);
}
