use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use embedding_api::Pipeline;
use metrics_exporter_prometheus::PrometheusHandle;
use semantic::Encoder;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Encoder plus request-level operations, shared across requests
    pub pipeline: Arc<Pipeline>,

    /// Renders `/metrics`; absent when no recorder was installed
    pub prometheus: Option<PrometheusHandle>,

    pub started_at: Instant,
}

impl ServerState {
    /// Create new server state around an already-loaded encoder
    pub fn new(config: ServerConfig, encoder: Arc<dyn Encoder>) -> ServerResult<Self> {
        let pipeline = Pipeline::new(encoder, config.pipeline.clone())
            .map_err(|e| ServerError::Config(e.to_string()))?;
        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            prometheus: None,
            started_at: Instant::now(),
        })
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    pub fn encoder(&self) -> &dyn Encoder {
        self.pipeline.encoder()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
