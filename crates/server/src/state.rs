use crate::config::ServerConfig;
use engine::DatasetRegistry;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Every dataset this process serves
    pub registry: Arc<DatasetRegistry>,

    /// Renders the Prometheus exposition; absent when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        registry: DatasetRegistry,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            metrics,
        }
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
    pub datasets: Vec<String>,
}
