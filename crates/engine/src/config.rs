use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Engine tunables, loadable from a TOML file. Every field has a default so
/// a missing config file just means defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Directory for persisted snapshots.
    pub snapshot_dir: PathBuf,

    /// Traversal bound for forward and backward propagation.
    pub max_depth: usize,

    /// Backward-propagation learning rate, clamped to [0.001, 0.1].
    pub learning_rate: f64,

    /// Commits pulled from the VCS adapter per history-learning run.
    pub history_limit: usize,

    /// Telemetry records folded in per learning run.
    pub telemetry_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from(impact_store::IMPACT_DIR_NAME),
            max_depth: impact_propagation::DEFAULT_MAX_DEPTH,
            learning_rate: impact_propagation::DEFAULT_LEARNING_RATE,
            history_limit: 50,
            telemetry_limit: 100,
        }
    }
}

impl EngineConfig {
    /// Read a config file, falling back to defaults when it is missing or
    /// malformed. Never fatal.
    pub async fn load(path: &Path) -> Self {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                log::warn!("Failed to read config {}: {e}", path.display());
                return Self::default();
            }
        };
        match toml::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Invalid config {}, using defaults: {e}", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_component_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.learning_rate, 0.01);
        assert_eq!(config.snapshot_dir, PathBuf::from(".impact"));
    }

    #[test]
    fn parses_partial_toml() {
        let config: EngineConfig = toml::from_str("max-depth = 5\n").unwrap();
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.learning_rate, 0.01);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(toml::from_str::<EngineConfig>("max-dept = 5\n").is_err());
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(&dir.path().join("impact.toml")).await;
        assert_eq!(config.max_depth, 3);
    }

    #[tokio::test]
    async fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("impact.toml");
        tokio::fs::write(&path, "max-depth = \"many\"").await.unwrap();
        let config = EngineConfig::load(&path).await;
        assert_eq!(config.max_depth, 3);
    }
}
