use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::eval::MetricsOptions;
use crate::grapher::GrapherOptions;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub kgenv: KgenvConfig,
    /// Required by the graph commands; the metrics tool runs without it.
    #[serde(default)]
    pub graph: Option<GraphConfig>,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// General settings
#[derive(Debug, Clone, Deserialize)]
pub struct KgenvConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for KgenvConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Knowledge graph inputs and action table shape
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Tab-separated triple file (head, relation, tail).
    pub triple_file: PathBuf,
    /// JSON token -> id map for entities.
    pub entity_vocab: PathBuf,
    /// JSON token -> id map for relations.
    pub relation_vocab: PathBuf,
    pub max_branching: usize,
    /// Maximum edges per relation type; unset disables reduction.
    #[serde(default)]
    pub class_threshhold: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl GraphConfig {
    pub fn options(&self) -> GrapherOptions {
        GrapherOptions {
            max_branching: self.max_branching,
            class_threshhold: self.class_threshhold,
            seed: self.seed,
        }
    }
}

/// Metrics aggregation settings
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_run_marker")]
    pub run_marker: String,
    #[serde(default = "default_scores_file")]
    pub scores_file: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            run_marker: default_run_marker(),
            scores_file: default_scores_file(),
        }
    }
}

impl MetricsConfig {
    pub fn options(&self) -> MetricsOptions {
        MetricsOptions {
            run_marker: self.run_marker.clone(),
            scores_file: self.scores_file.clone(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_run_marker() -> String {
    "TEST".to_string()
}

fn default_scores_file() -> String {
    "scores.txt".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in KGENV_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("KGENV_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::from_path(&config_path)
    }

    /// Load and validate configuration from an explicit path
    pub fn from_path(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::parse(&config_str)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn parse(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if let Some(graph) = &self.graph {
            for (key, path) in [
                ("graph.triple_file", &graph.triple_file),
                ("graph.entity_vocab", &graph.entity_vocab),
                ("graph.relation_vocab", &graph.relation_vocab),
            ] {
                if !path.is_file() {
                    anyhow::bail!("{} does not exist: {}", key, path.display());
                }
            }

            if graph.max_branching == 0 {
                anyhow::bail!("graph.max_branching must be greater than 0");
            }
        }

        if self.metrics.run_marker.is_empty() {
            anyhow::bail!("metrics.run_marker must not be empty");
        }

        Ok(())
    }

    /// Graph section, required by the graph commands
    pub fn graph(&self) -> Result<&GraphConfig> {
        self.graph
            .as_ref()
            .context("config has no [graph] section (triple_file, entity_vocab, relation_vocab, max_branching)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn create_test_config(temp_dir: &TempDir) -> String {
        let root = temp_dir.path().canonicalize().unwrap();
        for name in ["graph.txt", "entity_vocab.json", "relation_vocab.json"] {
            fs::write(root.join(name), "").unwrap();
        }
        let root_str = root.to_str().unwrap().replace('\\', "\\\\");
        format!(
            r#"
[kgenv]
log_level = "debug"

[graph]
triple_file = "{root}/graph.txt"
entity_vocab = "{root}/entity_vocab.json"
relation_vocab = "{root}/relation_vocab.json"
max_branching = 200
class_threshhold = 50
seed = 7

[metrics]
results_dir = "{root}/results"
"#,
            root = root_str
        )
    }

    fn with_config_env(config_path: &Path, f: impl FnOnce()) {
        let original = std::env::var("KGENV_CONFIG").ok();
        std::env::set_var("KGENV_CONFIG", config_path.to_str().unwrap());
        f();
        std::env::remove_var("KGENV_CONFIG");
        if let Some(val) = original {
            std::env::set_var("KGENV_CONFIG", val);
        }
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, create_test_config(&temp_dir)).unwrap();
        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.kgenv.log_level, "debug");
            let graph = config.graph().unwrap();
            assert_eq!(graph.max_branching, 200);
            let options = graph.options();
            assert_eq!(options.class_threshhold, Some(50));
            assert_eq!(options.seed, Some(7));
            assert_eq!(config.metrics.run_marker, "TEST");
            assert_eq!(config.metrics.options().scores_file, "scores.txt");
        });
    }

    #[test]
    fn test_config_metrics_only() {
        let config = Config::parse("[metrics]\nresults_dir = \"out\"\nrun_marker = \"seed\"\n").unwrap();
        assert!(config.graph.is_none());
        assert!(config.graph().is_err());
        assert_eq!(config.kgenv.log_level, "info");
        assert_eq!(config.metrics.results_dir, PathBuf::from("out"));
        assert_eq!(config.metrics.options().run_marker, "seed");
    }

    #[test]
    fn test_config_missing_triple_file() {
        let err = Config::parse(
            r#"
[graph]
triple_file = "/nonexistent/graph.txt"
entity_vocab = "/nonexistent/e.json"
relation_vocab = "/nonexistent/r.json"
max_branching = 10
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("graph.triple_file"));
    }

    #[test]
    fn test_config_zero_branching() {
        let temp_dir = TempDir::new().unwrap();
        let content = create_test_config(&temp_dir).replace("max_branching = 200", "max_branching = 0");
        let err = Config::parse(&content).unwrap_err();
        assert!(err.to_string().contains("max_branching"));
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_config_env(Path::new("nonexistent.toml"), || {
            let config = Config::load();
            assert!(config.is_err());
        });
    }
}
