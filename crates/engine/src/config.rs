use std::time::Duration;

use serde::{Deserialize, Serialize};

use features::InspectOptions;

use crate::EngineError;

/// Per-operation limits and defaults shared by every dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on any single embed, invert, llm or projection call.
    pub capability_timeout_secs: u64,
    /// Largest `gen_num` a generation request may ask for.
    pub max_gen_num: usize,
    pub prompt_cache_capacity: usize,
    pub prompt_idea_count: usize,
    pub top_feature_count: usize,
    pub similar_per_feature: usize,
    pub similar_top_percent: f64,
    pub neighbor_count: usize,
    /// Seed for similar-feature sampling; unset draws from entropy.
    pub sampling_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capability_timeout_secs: 180,
            max_gen_num: 20,
            prompt_cache_capacity: 1024,
            prompt_idea_count: 5,
            top_feature_count: 10,
            similar_per_feature: 5,
            similar_top_percent: 0.001,
            neighbor_count: 10,
            sampling_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        let bad = |msg: String| Err(EngineError::InvalidConfig(msg));
        if self.capability_timeout_secs == 0 {
            return bad("engine.capability_timeout_secs must be greater than 0".into());
        }
        if self.max_gen_num == 0 {
            return bad("engine.max_gen_num must be greater than 0".into());
        }
        if self.prompt_cache_capacity == 0 {
            return bad("engine.prompt_cache_capacity must be greater than 0".into());
        }
        if self.prompt_idea_count == 0 {
            return bad("engine.prompt_idea_count must be greater than 0".into());
        }
        if !self.similar_top_percent.is_finite() || !(0.0..=1.0).contains(&self.similar_top_percent)
        {
            return bad(format!(
                "engine.similar_top_percent must be within [0, 1], got {}",
                self.similar_top_percent
            ));
        }
        Ok(())
    }

    pub fn capability_timeout(&self) -> Duration {
        Duration::from_secs(self.capability_timeout_secs)
    }

    pub fn inspect_options(&self) -> InspectOptions {
        InspectOptions {
            top_count: self.top_feature_count,
            similar_per_feature: self.similar_per_feature,
            similar_top_percent: self.similar_top_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.capability_timeout(), Duration::from_secs(180));
        let opts = cfg.inspect_options();
        assert_eq!(opts.top_count, 10);
        assert_eq!(opts.similar_per_feature, 5);
    }

    #[test]
    fn zero_cache_is_rejected() {
        let cfg = EngineConfig {
            prompt_cache_capacity: 0,
            ..Default::default()
        };
        assert!(cfg
            .validate()
            .unwrap_err()
            .to_string()
            .contains("prompt_cache_capacity"));
    }

    #[test]
    fn top_percent_must_be_a_fraction() {
        let cfg = EngineConfig {
            similar_top_percent: 1.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
