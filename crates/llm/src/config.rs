use serde::{Deserialize, Serialize};

use semantic::resilience::RetryConfig;

use crate::LlmError;

/// Sampling temperature per prompt family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Temperatures {
    pub correction: f32,
    pub variation: f32,
    pub batch_correction: f32,
    pub prompt_ideas: f32,
}

impl Default for Temperatures {
    fn default() -> Self {
        Self {
            correction: 0.1,
            variation: 0.5,
            batch_correction: 0.1,
            prompt_ideas: 0.5,
        }
    }
}

/// Chat-completion endpoint settings.
///
/// # Example
/// ```
/// use llm::LlmConfig;
///
/// let cfg = LlmConfig {
///     mode: "api".into(),
///     api_url: "http://localhost:8000/v1/chat/completions".into(),
///     ..Default::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `"api"` (OpenAI-compatible endpoint) or `"fast"` (deterministic stub).
    pub mode: String,
    pub api_url: String,
    pub model: String,
    /// Environment variable holding the bearer token. Unset means no auth header.
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    pub temperatures: Temperatures,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_config: Option<RetryConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            mode: "fast".into(),
            api_url: "https://api.openai.com/v1/chat/completions".into(),
            model: "gpt-4o-mini".into(),
            api_key_env: Some("OPENAI_API_KEY".into()),
            timeout_secs: 60,
            temperatures: Temperatures::default(),
            retry_config: None,
        }
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<(), LlmError> {
        match self.mode.as_str() {
            "fast" => {}
            "api" => {
                if self.api_url.trim().is_empty() {
                    return Err(LlmError::InvalidConfig(
                        "llm.api_url is required for api mode".into(),
                    ));
                }
                if self.model.trim().is_empty() {
                    return Err(LlmError::InvalidConfig("llm.model must not be empty".into()));
                }
            }
            other => {
                return Err(LlmError::InvalidConfig(format!(
                    "llm.mode must be `api` or `fast`, got `{other}`"
                )))
            }
        }
        if self.timeout_secs == 0 {
            return Err(LlmError::InvalidConfig(
                "llm.timeout_secs must be greater than 0".into(),
            ));
        }
        let t = self.temperatures;
        for (name, value) in [
            ("correction", t.correction),
            ("variation", t.variation),
            ("batch_correction", t.batch_correction),
            ("prompt_ideas", t.prompt_ideas),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(LlmError::InvalidConfig(format!(
                    "llm.temperatures.{name} must be within [0, 2], got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hosted_model() {
        let cfg = LlmConfig::default();
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(cfg.temperatures.correction, 0.1);
        assert_eq!(cfg.temperatures.variation, 0.5);
        assert_eq!(cfg.temperatures.batch_correction, 0.1);
        assert_eq!(cfg.temperatures.prompt_ideas, 0.5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let mut cfg = LlmConfig::default();
        cfg.temperatures.variation = 3.5;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("temperatures.variation"));
    }

    #[test]
    fn rejects_unknown_mode() {
        let cfg = LlmConfig {
            mode: "local".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_yaml_like_json_fills_defaults() {
        let cfg: LlmConfig =
            serde_json::from_str(r#"{"mode": "api", "temperatures": {"variation": 0.9}}"#).unwrap();
        assert_eq!(cfg.temperatures.variation, 0.9);
        assert_eq!(cfg.temperatures.correction, 0.1);
        assert_eq!(cfg.timeout_secs, 60);
    }
}
