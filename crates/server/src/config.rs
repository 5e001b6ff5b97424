use embedding_api::PipelineConfig;
use semantic::EncoderConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level (an `EnvFilter` directive)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Expose `/metrics` in Prometheus text format
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Encoder selection and model assets
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Batch, relevance and clustering knobs
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            encoder: EncoderConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `server.{toml,yaml,json}` file and
    /// `EMBEDDING_API__*` environment variables, in increasing precedence.
    ///
    /// The bare `PORT` and `EMBEDDING_MODEL` variables are honoured last.
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(config::Environment::with_prefix("EMBEDDING_API").separator("__"));

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;
        config.apply_overrides(
            std::env::var("PORT").ok().as_deref(),
            std::env::var("EMBEDDING_MODEL").ok().as_deref(),
        )?;
        config.pipeline.validate()?;

        Ok(config)
    }

    fn apply_overrides(&mut self, port: Option<&str>, model: Option<&str>) -> anyhow::Result<()> {
        if let Some(port) = port {
            self.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PORT {port:?}: {e}"))?;
        }
        if let Some(model) = model.map(str::trim).filter(|m| !m.is_empty()) {
            if model != self.encoder.model_name {
                tracing::info!(model, "model overridden by EMBEDDING_MODEL");
            }
            self.encoder.model_name = model.to_string();
        }
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.max_body_size_mb, 10);
        assert!(cfg.enable_cors);
        assert!(cfg.metrics_enabled);
        assert_eq!(cfg.pipeline.batch_size, 32);
        assert_eq!(cfg.encoder.model_name, "all-MiniLM-L6-v2");
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 5000);
    }

    #[test]
    fn test_overrides() {
        let mut cfg = ServerConfig::default();
        cfg.apply_overrides(Some("8081"), Some("paraphrase-MiniLM-L6-v2"))
            .unwrap();
        assert_eq!(cfg.port, 8081);
        assert_eq!(cfg.encoder.model_name, "paraphrase-MiniLM-L6-v2");

        cfg.apply_overrides(None, Some("   ")).unwrap();
        assert_eq!(cfg.encoder.model_name, "paraphrase-MiniLM-L6-v2");

        assert!(cfg.apply_overrides(Some("not-a-port"), None).is_err());
    }

    #[test]
    fn test_nested_sections_deserialize() {
        let cfg: ServerConfig = serde_json::from_str(
            r#"{"port": 9000, "encoder": {"mode": "stub"}, "pipeline": {"batch_size": 4}}"#,
        )
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.encoder.mode, "stub");
        assert_eq!(cfg.pipeline.batch_size, 4);
        assert_eq!(cfg.pipeline.default_clusters, 5);
    }
}
