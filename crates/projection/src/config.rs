use serde::{Deserialize, Serialize};

use semantic::resilience::RetryConfig;

use crate::ProjectionError;

/// Reducer selection and the UMAP hyperparameters used when (re)fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// `"api"` (remote UMAP service) or `"pca"` (in-process).
    pub mode: String,
    /// Base URL of the UMAP service; `/fit` and `/transform` are appended.
    pub api_url: Option<String>,
    pub timeout_secs: u64,
    pub n_neighbors: usize,
    pub min_dist: f32,
    pub n_components: usize,
    pub metric: String,
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_config: Option<RetryConfig>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            mode: "pca".into(),
            api_url: None,
            timeout_secs: 120,
            n_neighbors: 100,
            min_dist: 0.1,
            n_components: 2,
            metric: "cosine".into(),
            seed: Some(42),
            retry_config: None,
        }
    }
}

impl ProjectionConfig {
    pub fn validate(&self) -> Result<(), ProjectionError> {
        match self.mode.as_str() {
            "pca" => {}
            "api" => {
                if self.api_url.as_deref().is_none_or(|u| u.trim().is_empty()) {
                    return Err(ProjectionError::InvalidConfig(
                        "projection.api_url is required for api mode".into(),
                    ));
                }
            }
            other => {
                return Err(ProjectionError::InvalidConfig(format!(
                    "projection.mode must be `api` or `pca`, got `{other}`"
                )))
            }
        }
        if self.n_components < 2 {
            return Err(ProjectionError::InvalidConfig(
                "projection.n_components must be at least 2".into(),
            ));
        }
        if self.n_neighbors < 2 {
            return Err(ProjectionError::InvalidConfig(
                "projection.n_neighbors must be at least 2".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_dist) {
            return Err(ProjectionError::InvalidConfig(format!(
                "projection.min_dist must be within [0, 1], got {}",
                self.min_dist
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_hyperparameters() {
        let cfg = ProjectionConfig::default();
        assert_eq!(cfg.n_neighbors, 100);
        assert_eq!(cfg.min_dist, 0.1);
        assert_eq!(cfg.n_components, 2);
        assert_eq!(cfg.metric, "cosine");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn api_mode_needs_url() {
        let cfg = ProjectionConfig {
            mode: "api".into(),
            ..Default::default()
        };
        assert!(cfg.validate().unwrap_err().to_string().contains("api_url"));
    }

    #[test]
    fn rejects_single_component() {
        let cfg = ProjectionConfig {
            n_components: 1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
