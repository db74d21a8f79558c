use serde::{Deserialize, Serialize};
use treetrim_prune::{DEFAULT_SEARCH_LIMIT, Engine, PruneError, check_thresholds};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Thresholds(#[from] PruneError),
}

/// Settings of one evaluation run. Every field has a default, so an empty
/// file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Cost budgets, kept sorted loosest first.
    pub thresholds: Vec<f64>,
    /// Hole budget `m`; absent means unbounded.
    pub max_holes: Option<usize>,
    pub engine: Engine,
    /// Expansion budget of the exact search.
    pub search_limit: u64,
    /// Evaluate only the first generated line of each completion.
    pub first_line_only: bool,
    /// Targets with fewer nodes are skipped.
    pub min_target_nodes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![8.0, 4.0, 2.0, 1.0, 0.5, 0.25],
            max_holes: None,
            engine: Engine::Exact,
            search_limit: DEFAULT_SEARCH_LIMIT,
            first_line_only: true,
            min_target_nodes: 0,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text)?;
        config.sort_thresholds()?;
        Ok(config)
    }

    /// Sorts and deduplicates the thresholds, loosest first.
    pub fn sort_thresholds(&mut self) -> Result<(), PruneError> {
        if let Some(&nan) = self.thresholds.iter().find(|threshold| threshold.is_nan()) {
            return Err(PruneError::InvalidThreshold(nan));
        }
        self.thresholds.sort_by(|a, b| b.total_cmp(a));
        self.thresholds.dedup();
        check_thresholds(&self.thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_the_default() {
        assert_eq!(PipelineConfig::from_toml("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn thresholds_are_sorted_on_load() {
        let config = PipelineConfig::from_toml(
            r#"
            thresholds = [0.5, 4.0, 2.0, 4.0]
            engine = "greedy"
            max_holes = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.thresholds, [4.0, 2.0, 0.5]);
        assert_eq!(config.engine, Engine::Greedy);
        assert_eq!(config.max_holes, Some(3));
        assert!(config.first_line_only);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = PipelineConfig::from_toml("holes = 2").unwrap_err();
        assert!(matches!(error, ConfigError::Toml(_)), "{error}");
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let error = PipelineConfig::from_toml("thresholds = [1.0, nan]").unwrap_err();
        assert!(matches!(error, ConfigError::Thresholds(PruneError::InvalidThreshold(_))));
    }
}
