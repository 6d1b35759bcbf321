//! Server initialization and routing
//!
//! Builds the router, loads every dataset named in the stack configuration
//! and serves until SIGTERM or Ctrl+C.

use crate::config::ServerConfig;
use crate::telemetry::{install_recorder, PrometheusMetrics};
use crate::middleware::{log_requests, request_id};
use crate::routes::{api_info, corpus, generate, health, inspect, not_found};
use crate::state::ServerState;
use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{delete, get, post, put};
use axum::Router;
use engine::{EngineMetrics, NoopMetrics};
use std::net::SocketAddr;
use std::sync::Arc;
use steerspace::{build_registry, StackConfig};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
///
/// Middleware, outermost first: tracing, request id, request logging, CORS,
/// compression, timeout, body limit.
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route("/metadata", get(health::server_metadata))
        .route(
            "/top_activations_and_neighbors",
            get(inspect::top_activations),
        )
        .route("/generate_points", get(generate::generate_points))
        .route("/generate_points_llm", get(generate::generate_points_llm))
        .route("/interpolate_points", get(generate::interpolate_points))
        .route("/get_prompt_ideas", get(generate::get_prompt_ideas))
        .route("/add_sentence_manual", post(corpus::add_sentence_manual))
        .route("/remove_sentence", delete(corpus::remove_sentence))
        .route("/edit_sentence", put(corpus::edit_sentence))
        .route("/add_sentences", post(corpus::add_sentences))
        .route("/reembed_sentences", post(corpus::reembed_sentences))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
///
/// Sets up JSON logging, installs the metrics recorder when enabled, loads
/// the stack configuration at `config.stack_config_path`, fits every dataset's
/// projector and serves until shutdown.
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .init();

    let (handle, engine_metrics) = if config.metrics_enabled {
        let handle = install_recorder().context("installing the Prometheus recorder")?;
        (Some(handle), Arc::new(PrometheusMetrics) as Arc<dyn EngineMetrics>)
    } else {
        (None, Arc::new(NoopMetrics) as Arc<dyn EngineMetrics>)
    };

    let stack = StackConfig::from_file(&config.stack_config_path).with_context(|| {
        format!(
            "loading stack config {}",
            config.stack_config_path.display()
        )
    })?;
    let registry = build_registry(&stack, engine_metrics).await?;

    let addr: SocketAddr = config.socket_addr()?;
    tracing::info!(
        addr = %addr,
        datasets = ?registry.names(),
        timeout_s = config.timeout_secs,
        cors = config.enable_cors,
        metrics = config.metrics_enabled,
        "starting steer server"
    );

    let state = Arc::new(ServerState::new(config, registry, handle));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
