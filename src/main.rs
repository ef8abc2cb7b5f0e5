use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing::{error, info, warn};

use multichain_gateway::api::{RateLimitConfig, create_router_with_rate_limit};
use multichain_gateway::app::{AppState, GatewayConfig, ServerConfig};
use multichain_gateway::infra::{LogFormat, ReqwestTransport, init_metrics, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let log_format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());
    init_tracing(log_format);

    let config = Arc::new(GatewayConfig::from_env().context("invalid gateway configuration")?);
    let server = ServerConfig::from_env().context("invalid server configuration")?;
    let rate_limit = RateLimitConfig::from_env();

    info!(
        provider = %config.endpoints.provider_api_url,
        eth_rpc = %config.endpoints.eth_rpc_url,
        bsc_rpc = %config.endpoints.bsc_rpc_url,
        sol_rpc = %config.endpoints.sol_rpc_url,
        retries = config.http.retry.max_retries,
        batch_concurrency = config.batch_concurrency,
        "Configuration loaded"
    );

    let transport = Arc::new(ReqwestTransport::new().context("failed to build HTTP client")?);
    let mut state = AppState::new(Arc::clone(&config), transport);
    match init_metrics() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!(error = %e, "Metrics recorder not installed; /metrics disabled"),
    }

    let router = create_router_with_rate_limit(Arc::new(state), rate_limit, server.request_timeout);

    let listener = tokio::net::TcpListener::bind(server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", server.bind_addr))?;
    info!(addr = %server.bind_addr, "Server starting");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
