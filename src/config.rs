//! YAML configuration for a whole steering stack.
//!
//! One file describes the external services (embedding and inversion, chat
//! model, projection), engine limits and every dataset to serve.
//!
//! ```yaml
//! version: "1.0"
//! name: "local demo"
//!
//! semantic:
//!   mode: "api"
//!   api_url: "http://localhost:8081/embed"
//!   inversion:
//!     mode: "api"
//!     api_url: "http://localhost:8081/invert"
//!     num_steps: 20
//!
//! llm:
//!   mode: "api"
//!   model: "gpt-4o-mini"
//!   api_key_env: "OPENAI_API_KEY"
//!
//! projection:
//!   mode: "pca"
//!
//! engine:
//!   capability_timeout_secs: 180
//!   max_gen_num: 20
//!
//! datasets:
//!   - name: "poems"
//!     sae_path: "data/poems/sae.safetensors"
//!     sae_layout: "normalized"
//!     summaries_path: "data/poems/feature_summaries.json"
//!     embeddings_path: "data/poems/embeddings.safetensors"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use engine::EngineConfig;
use features::SaeLayout;
use llm::LlmConfig;
use projection::ProjectionConfig;
use semantic::SemanticConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}

/// Top-level stack configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StackConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Embedding and inversion endpoints
    #[serde(default)]
    pub semantic: SemanticConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub projection: ProjectionConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub datasets: Vec<DatasetConfig>,
}

impl StackConfig {
    /// Load a YAML configuration file from the given path.
    ///
    /// Relative artifact paths are resolved against the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        if let Some(dir) = path.parent() {
            for dataset in &mut config.datasets {
                dataset.resolve_relative_to(dir);
            }
        }
        Ok(config)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: StackConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.semantic.validate().map_err(validation)?;
        self.llm.validate().map_err(validation)?;
        self.projection.validate().map_err(validation)?;
        self.engine.validate().map_err(validation)?;

        if self.datasets.is_empty() {
            return Err(ConfigLoadError::MissingField("datasets".to_string()));
        }
        let mut seen = HashSet::new();
        for (i, dataset) in self.datasets.iter().enumerate() {
            dataset.validate(i)?;
            if !seen.insert(dataset.name.as_str()) {
                return Err(ConfigLoadError::Validation(format!(
                    "datasets[{i}].name `{}` is used more than once",
                    dataset.name
                )));
            }
        }
        Ok(())
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.name == name)
    }
}

fn validation(err: impl std::fmt::Display) -> ConfigLoadError {
    ConfigLoadError::Validation(err.to_string())
}

/// On-disk artifacts of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,

    /// Sparse autoencoder weights (safetensors).
    pub sae_path: PathBuf,

    #[serde(default)]
    pub sae_layout: SaeLayout,

    /// Feature directions; the autoencoder's decoder rows when absent.
    #[serde(default)]
    pub features_path: Option<PathBuf>,

    #[serde(default = "default_features_tensor")]
    pub features_tensor: String,

    /// JSON feature summaries; features are left undescribed when absent.
    #[serde(default)]
    pub summaries_path: Option<PathBuf>,

    /// Initial sentence embeddings (safetensors, N×D).
    pub embeddings_path: PathBuf,

    #[serde(default = "default_embeddings_tensor")]
    pub embeddings_tensor: String,
}

impl DatasetConfig {
    fn validate(&self, i: usize) -> Result<(), ConfigLoadError> {
        if self.name.trim().is_empty() {
            return Err(ConfigLoadError::MissingField(format!("datasets[{i}].name")));
        }
        if self.sae_path.as_os_str().is_empty() {
            return Err(ConfigLoadError::MissingField(format!(
                "datasets[{i}].sae_path"
            )));
        }
        if self.embeddings_path.as_os_str().is_empty() {
            return Err(ConfigLoadError::MissingField(format!(
                "datasets[{i}].embeddings_path"
            )));
        }
        Ok(())
    }

    fn resolve_relative_to(&mut self, dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        };
        resolve(&mut self.sae_path);
        resolve(&mut self.embeddings_path);
        if let Some(p) = self.features_path.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.summaries_path.as_mut() {
            resolve(p);
        }
    }
}

fn default_features_tensor() -> String {
    "directions".to_string()
}
fn default_embeddings_tensor() -> String {
    "embeddings".to_string()
}
