//! HTTP JSON API for text embeddings.
//!
//! Exposes the `embedding_api` pipeline over axum: embeddings for single
//! texts and chunked batches, cosine ranking from texts or raw vectors,
//! per-topic relevance filtering, and k-means grouping.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - service info and endpoint catalogue
//! - `GET /health` - liveness plus loaded model details
//! - `GET /model/info` - model details and known models
//! - `GET /metrics` - Prometheus metrics
//! - `POST /embed`, `POST /embed/single`, `POST /embed/batch`
//! - `POST /similarity`, `POST /similarity/embeddings`
//! - `POST /find-relevant-content`
//! - `POST /cluster-content`
//!
//! Errors are JSON `{"error": {"code", "message", "details"?}}` with one
//! status per failure kind (400 validation, 422 dimension mismatch, 503
//! encoder failure, 501 clustering not built in).

pub mod config;
pub mod error;
pub mod middleware;
pub mod pipeline_metrics;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
