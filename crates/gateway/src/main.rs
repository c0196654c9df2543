//! AskForge Crypto Gateway
//!
//! HTTP front for the market analyst.
//! Handles:
//! - Market data lookup per request
//! - Analyst model calls with schema-checked replies
//! - Rate limiting
//! - Observability (logging, metrics, request ids)

mod analyst;
mod handlers;
mod market;
mod middleware;
mod models;

use anyhow::Context;
use askforge_common::{
    config::AppConfig,
    llm::OpenAiChatClient,
    metrics,
    telemetry::{init_tracing, LogTarget},
};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::oneshot;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::analyst::Analyst;
use crate::market::{CoinGeckoClient, MarketDataSource};
use crate::middleware::rate_limit::{rate_limit_middleware, GlobalRateLimiter};
use crate::middleware::request_metrics::track_requests;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub market: Arc<dyn MarketDataSource>,
    pub analyst: Arc<Analyst>,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.observability, LogTarget::Stdout);

    info!("Starting AskForge Crypto Gateway v{}", askforge_common::VERSION);

    // Initialize metrics
    let metrics_handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            metrics::LLM_BUCKETS,
        )?
        .install_recorder()?;
    metrics::register_metrics();

    let config = Arc::new(config);

    let analyst_model = OpenAiChatClient::new(config.analyst.chat_settings()?)?;
    let market = CoinGeckoClient::new(&config.market)?;

    let state = AppState {
        config: config.clone(),
        market: Arc::new(market),
        analyst: Arc::new(Analyst::new(Arc::new(analyst_model))),
        metrics: metrics_handle,
    };
    let limiter = GlobalRateLimiter::new(&config.rate_limit);

    // Build the router
    let app = create_router(state, limiter);

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    let (signalled_tx, signalled_rx) = oneshot::channel();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();

    tokio::select! {
        result = server => {
            result?;
            info!("Server shutdown complete");
        }
        _ = shutdown_deadline(signalled_rx, config.shutdown_timeout()) => {
            warn!(
                timeout_secs = config.server.shutdown_timeout_secs,
                "Shutdown timed out, dropping in-flight requests"
            );
        }
    }

    Ok(())
}

/// Create the main application router
fn create_router(state: AppState, limiter: GlobalRateLimiter) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut crypto_routes = Router::new()
        .route("/crypto/analyze", post(handlers::crypto::analyze))
        .route("/crypto/compare", post(handlers::crypto::compare));

    if state.config.rate_limit.enabled {
        crypto_routes =
            crypto_routes.route_layer(from_fn_with_state(limiter, rate_limit_middleware));
    }

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/metrics", get(handlers::health::metrics))
        .merge(crypto_routes)
        .route_layer(from_fn(track_requests))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Resolves once `grace` has passed after the shutdown signal
///
/// Never resolves if the signal sender is dropped without firing.
async fn shutdown_deadline(signalled: oneshot::Receiver<()>, grace: Duration) {
    match signalled.await {
        Ok(()) => tokio::time::sleep(grace).await,
        Err(_) => std::future::pending().await,
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
