//! Map-data HTTP view
//!
//! Serves the top traders and their connections for the bubble-map page.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::analyzer::TokenAnalyzer;
use crate::config::ServerConfig;
use crate::token::{Chain, TopTrader};
use crate::{Error, Result};

/// Shared state for handlers
pub struct AppState {
    /// Analysis pipeline
    pub analyzer: Arc<TokenAnalyzer>,
    /// Upper bound for one analysis
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct MapQuery {
    #[serde(default)]
    chain: Option<String>,
}

/// Payload of `GET /bubble_map/{address}`
#[derive(Debug, Serialize)]
struct BubbleMapView {
    contract_address: String,
    chain: Chain,
    top_traders: Vec<TopTrader>,
    trader_connections: BTreeMap<String, u32>,
}

/// Build the router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/bubble_map/{address}", get(bubble_map_handler))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.host:config.port` and serve until a shutdown signal
pub async fn serve(config: &ServerConfig, analyzer: Arc<TokenAnalyzer>) -> Result<()> {
    let addr = SocketAddr::new(
        config
            .host
            .parse()
            .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
        config.port,
    );

    let state = Arc::new(AppState {
        analyzer,
        request_timeout: config.request_timeout,
    });
    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(host = %config.host, port = config.port, "Listening");
    info!("  GET http://{addr}/bubble_map/{{address}}?chain=eth");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Internal(e.to_string()))?;

    info!("Server stopped");
    Ok(())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn bubble_map_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(query): Query<MapQuery>,
) -> Response {
    let chain = match query.chain.as_deref().map(str::parse::<Chain>) {
        None => Chain::default(),
        Some(Ok(chain)) => chain,
        Some(Err(e)) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    // Detached on timeout: the task still completes and caches the record
    let analyzer = Arc::clone(&state.analyzer);
    let task_address = address.clone();
    let task = tokio::spawn(async move { analyzer.get_or_compute(&task_address, chain).await });

    match tokio::time::timeout(state.request_timeout, task).await {
        Ok(Ok(Ok(record))) => Json(BubbleMapView {
            contract_address: record.contract_address,
            chain: record.chain,
            top_traders: record.top_traders,
            trader_connections: record.trader_connections,
        })
        .into_response(),
        Ok(Ok(Err(e @ Error::ComputationFailed { .. }))) => {
            warn!(address = %address, chain = %chain, error = %e, "Token data not found");
            error_response(StatusCode::NOT_FOUND, "Token data not found")
        }
        Ok(Ok(Err(e))) => {
            error!(address = %address, chain = %chain, error = %e, "Analysis failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
        Ok(Err(e)) => {
            error!(address = %address, chain = %chain, error = %e, "Analysis task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
        Err(_) => {
            warn!(address = %address, chain = %chain, "Analysis timed out");
            error_response(StatusCode::GATEWAY_TIMEOUT, "Analysis timed out")
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Resolve on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
