//! Service configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use viridian_engine::{EngineConfig, ScoringConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(String),
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level configuration, one TOML table per section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub engine: EngineConfig,
    pub scoring: ScoringConfig,
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load configuration from file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config
            .scoring
            .validate()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viridian_types::InfoCategory;

    #[test]
    fn missing_file_yields_defaults() {
        let config = ServiceConfig::load("/nonexistent/viridian.toml").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert!(config.engine.require_change_reason);
    }

    #[test]
    fn sections_are_optional() {
        let config = ServiceConfig::from_toml_str(
            r#"
            [engine]
            max_lineage_depth = 16

            [scoring.categories.pressArticle]
            environment = 10

            [logging]
            json = true
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.max_lineage_depth, 16);
        assert!(config.engine.require_change_reason);
        assert_eq!(
            config.scoring.factors(InfoCategory::PressArticle).environment,
            10
        );
        assert!(config.logging.json);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn unknown_scoring_categories_are_rejected() {
        let err = ServiceConfig::from_toml_str("[scoring.categories.rumour]\nenvironment = 5\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = ServiceConfig::from_toml_str("[engine\nmax_lineage_depth = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
