//! Scoring configuration.
//!
//! ```toml
//! hard_pod_affinity_weight = 1
//! max_score = 10
//! parallelism = 16
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PlacementError, PlacementResult};

/// Upper bound for the symmetric weight of hard affinity terms.
pub const MAX_HARD_POD_AFFINITY_WEIGHT: i64 = 100;

/// Tunables of the inter-pod affinity scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight a placed pod's hard affinity term contributes when the
    /// incoming pod matches it. `0` disables the symmetric step.
    pub hard_pod_affinity_weight: i64,
    /// Upper end of the normalized score range.
    pub max_score: i64,
    /// Worker threads used for the pairwise scan.
    pub parallelism: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            hard_pod_affinity_weight: 1,
            max_score: 10,
            parallelism: 16,
        }
    }
}

impl ScoringConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: ScoringConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> PlacementResult<()> {
        if !(0..=MAX_HARD_POD_AFFINITY_WEIGHT).contains(&self.hard_pod_affinity_weight) {
            return Err(PlacementError::Config(format!(
                "hard_pod_affinity_weight must be within 0..={MAX_HARD_POD_AFFINITY_WEIGHT}, got {}",
                self.hard_pod_affinity_weight
            )));
        }
        if self.max_score <= 0 {
            return Err(PlacementError::Config(format!(
                "max_score must be positive, got {}",
                self.max_score
            )));
        }
        if self.parallelism == 0 {
            return Err(PlacementError::Config(
                "parallelism must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
