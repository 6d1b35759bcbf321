use serde::{Deserialize, Serialize};

use crate::resilience::{CircuitBreakerConfig, RetryConfig};
use crate::SemanticError;

/// Configuration for the embedding endpoint and the inversion endpoint.
///
/// # Example
/// ```
/// use semantic::SemanticConfig;
///
/// let cfg = SemanticConfig {
///     mode: "api".into(),
///     api_url: Some("https://api.openai.com/v1/embeddings".into()),
///     api_auth_header: Some("Bearer sk-xxx".into()),
///     api_provider: Some("openai".into()),
///     ..Default::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    /// `"api"` (remote HTTP) or `"fast"` (deterministic local stub).
    pub mode: String,
    /// Model name sent to providers that want one (OpenAI-style payloads).
    pub model_name: String,
    /// Embedding endpoint when [`mode`](Self::mode) is `"api"`.
    pub api_url: Option<String>,
    /// Authorization header value (e.g., `"Bearer hf_xxx"`).
    pub api_auth_header: Option<String>,
    /// Payload shape: `"hf"`, `"openai"`, or `"custom"` (default).
    pub api_provider: Option<String>,
    /// Per-request HTTP timeout in seconds.
    pub api_timeout_secs: Option<u64>,
    /// L2-normalize returned embeddings. Off by default: stored embeddings
    /// keep the encoder's raw scale and steering normalizes on its own.
    pub normalize: bool,
    /// Vector length produced by the `"fast"` stub.
    pub stub_dim: usize,
    /// Text-inversion endpoint.
    pub inversion: InversionConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_config: Option<RetryConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_breaker_config: Option<CircuitBreakerConfig>,
    /// Apply retry and circuit breaking to remote calls.
    pub enable_resilience: bool,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            mode: "fast".into(),
            model_name: "gtr-t5-base".into(),
            api_url: None,
            api_auth_header: None,
            api_provider: None,
            api_timeout_secs: Some(30),
            normalize: false,
            stub_dim: 768,
            inversion: InversionConfig::default(),
            retry_config: None,
            circuit_breaker_config: None,
            enable_resilience: true,
        }
    }
}

/// Embedding-to-text inversion service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InversionConfig {
    /// `"api"` or `"fast"`.
    pub mode: String,
    pub api_url: Option<String>,
    pub api_auth_header: Option<String>,
    /// Correction steps the inverter runs per embedding.
    pub num_steps: u32,
    pub timeout_secs: Option<u64>,
}

impl Default for InversionConfig {
    fn default() -> Self {
        Self {
            mode: "fast".into(),
            api_url: None,
            api_auth_header: None,
            num_steps: 20,
            timeout_secs: Some(120),
        }
    }
}

fn check_mode(field: &str, mode: &str, url: Option<&str>) -> Result<(), SemanticError> {
    match mode {
        "fast" => Ok(()),
        "api" => match url {
            Some(u) if !u.trim().is_empty() => Ok(()),
            _ => Err(SemanticError::InvalidConfig(format!(
                "{field}.api_url is required for api mode"
            ))),
        },
        other => Err(SemanticError::InvalidConfig(format!(
            "{field}.mode must be `api` or `fast`, got `{other}`"
        ))),
    }
}

impl SemanticConfig {
    pub fn validate(&self) -> Result<(), SemanticError> {
        check_mode("semantic", &self.mode, self.api_url.as_deref())?;
        check_mode(
            "semantic.inversion",
            &self.inversion.mode,
            self.inversion.api_url.as_deref(),
        )?;
        if self.mode == "fast" && self.stub_dim == 0 {
            return Err(SemanticError::InvalidConfig(
                "semantic.stub_dim must be greater than 0".into(),
            ));
        }
        if self.inversion.num_steps == 0 {
            return Err(SemanticError::InvalidConfig(
                "semantic.inversion.num_steps must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
