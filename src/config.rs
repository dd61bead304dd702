//! Crawl configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use webrover_core_types::{GoalThresholds, RoverError};

/// Configuration for one crawl session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Where the crawl starts.
    pub start_url: String,

    /// Maximum actions a delegate takes on a single page visit before
    /// handing control back.
    /// Default: 25
    pub max_steps_per_page: u32,

    /// Driver round budget; the crawl is force-stopped beyond it.
    /// 0 disables the guard. Default: 10000
    pub max_rounds: u64,

    /// Sleep between driver rounds in milliseconds.
    /// Default: 10
    pub tick_interval_ms: u64,

    /// Directory screenshots are written into.
    /// Default: "screenshots"
    pub screenshot_dir: PathBuf,

    /// Mission handed to delegates when no explicit goal is set.
    pub default_goal: String,

    pub goal: GoalConfig,
}

/// Convergence parameters for the goal-directed agent.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalConfig {
    /// Minimum goal/progress similarity. Default: 0.75
    pub similarity_threshold: f32,

    /// Minimum intent-classification confidence. Default: 0.70
    pub intent_threshold: f32,

    /// Minimum weighted overall score. Default: 0.80
    pub overall_threshold: f32,

    /// Minimum per-round metric gain that still counts as progress.
    /// Default: 0.05
    pub improvement_epsilon: f32,

    /// Validation rounds before the goal run gives up. Default: 12
    pub max_validation_rounds: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_url: "https://example.com".into(),
            max_steps_per_page: 25,
            max_rounds: 10_000,
            tick_interval_ms: 10,
            screenshot_dir: PathBuf::from("screenshots"),
            default_goal: "explore every interactive element on this page".into(),
            goal: GoalConfig::default(),
        }
    }
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.75,
            intent_threshold: 0.70,
            overall_threshold: 0.80,
            improvement_epsilon: 0.05,
            max_validation_rounds: 12,
        }
    }
}

impl CrawlConfig {
    /// Load from a YAML file; missing fields fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, RoverError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| RoverError::internal(format!("read {}: {err}", path.display())))?;
        serde_yaml::from_str(&raw)
            .map_err(|err| RoverError::internal(format!("parse {}: {err}", path.display())))
    }
}

impl GoalConfig {
    pub fn thresholds(&self) -> GoalThresholds {
        GoalThresholds {
            similarity: self.similarity_threshold,
            intent: self.intent_threshold,
            overall: self.overall_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = CrawlConfig::default();
        assert_eq!(config.max_steps_per_page, 25);
        assert_eq!(config.goal.improvement_epsilon, 0.05);
        assert!(config.goal.overall_threshold > config.goal.intent_threshold);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let parsed: CrawlConfig =
            serde_yaml::from_str("start_url: https://site.test\nmax_steps_per_page: 5\n").unwrap();
        assert_eq!(parsed.start_url, "https://site.test");
        assert_eq!(parsed.max_steps_per_page, 5);
        assert_eq!(parsed.max_rounds, 10_000);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rover.yaml");
        std::fs::write(&path, "start_url: https://site.test\ngoal:\n  max_validation_rounds: 3\n")
            .unwrap();

        let config = CrawlConfig::from_file(&path).unwrap();
        assert_eq!(config.start_url, "https://site.test");
        assert_eq!(config.goal.max_validation_rounds, 3);

        assert!(CrawlConfig::from_file(&dir.path().join("missing.yaml")).is_err());
    }
}
