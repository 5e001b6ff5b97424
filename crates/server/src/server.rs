//! Server initialization and routing
//!
//! Router construction, the middleware stack, startup (logging, metrics
//! recorder, encoder load) and graceful shutdown.

use crate::config::ServerConfig;
use crate::middleware::{log_requests, request_id};
use crate::pipeline_metrics::PrometheusPipelineMetrics;
use crate::routes::{api_info, not_found};
use crate::routes::{content, embed, health, similarity};
use crate::state::ServerState;
use crate::error::ServerError;
use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
///
/// Middleware, outermost first: tracing, request ID, request logging,
/// CORS, compression, timeout, body limit.
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let service_routes = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/model/info", get(health::model_info))
        .route("/metrics", get(health::metrics));

    let api_routes = Router::new()
        .route("/embed", post(embed::embed))
        .route("/embed/single", post(embed::embed_single))
        .route("/embed/batch", post(embed::embed_batch))
        .route("/similarity", post(similarity::similarity))
        .route(
            "/similarity/embeddings",
            post(similarity::similarity_embeddings),
        )
        .route(
            "/find-relevant-content",
            post(content::find_relevant_content),
        )
        .route("/cluster-content", post(content::cluster_content))
        .layer(DefaultBodyLimit::max(state.config.max_body_size()));

    Router::new()
        .merge(service_routes)
        .merge(api_routes)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(state.config.timeout())),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Elapsed deadlines become the JSON `REQUEST_TIMEOUT` error.
async fn handle_middleware_error(err: axum::BoxError) -> ServerError {
    ServerError::from(err)
}

/// Start the embedding HTTP server
///
/// Blocks until SIGTERM or Ctrl+C.
///
/// 1. Sets up structured JSON logging with the configured log level
/// 2. Installs the Prometheus recorder and pipeline metrics hook (when enabled)
/// 3. Loads the encoder once; every request shares it
/// 4. Binds to the configured TCP address and serves with graceful shutdown
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .init();

    let prometheus = if config.metrics_enabled {
        let handle = PrometheusBuilder::new().install_recorder()?;
        embedding_api::set_pipeline_metrics(Some(Arc::new(PrometheusPipelineMetrics)));
        Some(handle)
    } else {
        None
    };

    let encoder = semantic::load_encoder(&config.encoder).await?;

    let mut state = ServerState::new(config.clone(), encoder)?;
    if let Some(handle) = prometheus {
        state = state.with_prometheus(handle);
    }
    let state = Arc::new(state);

    let app = build_router(state.clone());

    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        "Starting embedding server on {} with model {} ({} dims)",
        addr,
        state.encoder().model_name(),
        state.encoder().embedding_dimension()
    );
    tracing::info!(
        "Timeout: {}s, Max body: {}MB",
        config.timeout_secs,
        config.max_body_size_mb
    );
    tracing::info!(
        "CORS: {}, Metrics: {}, Clustering: {}",
        config.enable_cors,
        config.metrics_enabled,
        state.pipeline.clustering_available()
    );

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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
