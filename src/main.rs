//! Load a stack configuration and report what it would serve.

use std::error::Error;
use std::sync::Arc;

use steerspace::{NoopMetrics, StackConfig, build_registry};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "stack.yaml".to_string());
    let stack = StackConfig::from_file(&path)?;
    let registry = build_registry(&stack, Arc::new(NoopMetrics)).await?;

    for name in registry.names() {
        let dataset = registry.get(&name)?;
        println!(
            "{name}: {} sentences, {} features of dimension {}",
            dataset.len().await,
            dataset.catalog().len(),
            dataset.catalog().dim()
        );
    }
    Ok(())
}
