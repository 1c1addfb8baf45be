//! Top-level configuration: one YAML file, one sub-struct per named
//! section, each with a `Default` matching its component's own defaults,
//! so that `Config::default()` alone is runnable.

use crate::alerts::AlertConfig;
use crate::champion_tracker::ChampionConfig;
use crate::diversity::DiversityConfig;
use crate::feedback::ComposerConfig;
use crate::runtime_monitor::RuntimeMonitorConfig;
use crate::sandbox::SandboxConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: serde_yaml::Error },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// `history:` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: PathBuf,
    /// Optional rotation hint; the core never rotates on its own.
    pub max_bytes: Option<u64>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("history.jsonl"), max_bytes: None }
    }
}

/// `field_manifest:` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldManifestConfig {
    pub path: PathBuf,
}

impl Default for FieldManifestConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("field_manifest.json") }
    }
}

/// `champion_path`/misc top-level settings outside any named section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sandbox: SandboxConfig,
    pub runtime_monitor: RuntimeMonitorConfig,
    pub champion: ChampionConfig,
    pub diversity: DiversityConfig,
    pub composer: ComposerConfig,
    pub alerts_suppression_window_s: i64,
    pub history: HistoryConfig,
    pub field_manifest: FieldManifestConfig,
    pub champion_path: PathBuf,
    pub failure_patterns_path: PathBuf,
    pub alerts_log_path: PathBuf,
    pub exploration_burst: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sandbox: SandboxConfig::default(),
            runtime_monitor: RuntimeMonitorConfig::default(),
            champion: ChampionConfig::default(),
            diversity: DiversityConfig::default(),
            composer: ComposerConfig::default(),
            alerts_suppression_window_s: 300,
            history: HistoryConfig::default(),
            field_manifest: FieldManifestConfig::default(),
            champion_path: PathBuf::from("champion.json"),
            failure_patterns_path: PathBuf::from("failure_patterns.json"),
            alerts_log_path: PathBuf::from("alerts.log.jsonl"),
            exploration_burst: 5,
        }
    }
}

impl Config {
    /// Load from a YAML file; a missing or unparseable file is a fatal
    /// `ConfigError`.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn alert_config(&self) -> AlertConfig {
        AlertConfig { suppression_window: chrono::Duration::seconds(self.alerts_suppression_window_s), ..AlertConfig::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_self_consistent() {
        let config = Config::default();
        assert!(config.sandbox.enabled);
        assert_eq!(config.champion.probation_period, 2);
        assert_eq!(config.diversity.window, 10);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = Config::load("/nonexistent/strataloop-config.yaml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn round_trips_through_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "sandbox:\n  enabled: false\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert!(!config.sandbox.enabled);
        assert_eq!(config.champion.min_sharpe, 0.5, "unspecified sections still fall back to their defaults");
    }
}
