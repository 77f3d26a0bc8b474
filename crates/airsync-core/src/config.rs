//! Engine configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::thresholds::ThresholdConfig;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the remote store (e.g. `https://xyz.supabase.co`).
    pub base_url: String,
    /// API key, sent both as `apikey` and as a bearer token.
    pub api_key: String,
    /// Table holding the sensor readings.
    pub table: String,
    /// Timestamp column used for filtering and ordering.
    pub time_column: String,
    /// Maximum rows per page request.
    pub page_limit: usize,
    /// Maximum pages per window fetch before aborting with a truncation
    /// signal.
    pub max_pages: usize,
    /// Background sync interval in minutes.
    pub poll_interval_minutes: u64,
    /// Alert limits for the background sync.
    pub thresholds: ThresholdConfig,
}

/// Minimum background poll interval in minutes.
pub const MIN_POLL_INTERVAL_MINUTES: u64 = 1;
/// Maximum background poll interval in minutes (24 hours).
pub const MAX_POLL_INTERVAL_MINUTES: u64 = 24 * 60;

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            table: "PMSensor".to_string(),
            time_column: "Measure_time".to_string(),
            page_limit: 1000,
            max_pages: 64,
            poll_interval_minutes: 5,
            thresholds: ThresholdConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Base URL is present with an http(s) scheme
    /// - API key, table, and time column are not empty
    /// - Page limit is at least 1 and page cap at least 1
    /// - Poll interval is within 1 minute to 24 hours
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.base_url.is_empty() {
            errors.push(ValidationError {
                field: "base_url".to_string(),
                message: "base URL cannot be empty".to_string(),
            });
        } else if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            errors.push(ValidationError {
                field: "base_url".to_string(),
                message: format!(
                    "base URL must start with http:// or https://, got '{}'",
                    self.base_url
                ),
            });
        }

        if self.api_key.is_empty() {
            errors.push(ValidationError {
                field: "api_key".to_string(),
                message: "API key cannot be empty".to_string(),
            });
        }

        if self.table.is_empty() {
            errors.push(ValidationError {
                field: "table".to_string(),
                message: "table name cannot be empty".to_string(),
            });
        }

        if self.time_column.is_empty() {
            errors.push(ValidationError {
                field: "time_column".to_string(),
                message: "time column cannot be empty".to_string(),
            });
        }

        if self.page_limit == 0 {
            errors.push(ValidationError {
                field: "page_limit".to_string(),
                message: "page limit must be at least 1".to_string(),
            });
        }

        if self.max_pages == 0 {
            errors.push(ValidationError {
                field: "max_pages".to_string(),
                message: "page cap must be at least 1".to_string(),
            });
        }

        if !(MIN_POLL_INTERVAL_MINUTES..=MAX_POLL_INTERVAL_MINUTES)
            .contains(&self.poll_interval_minutes)
        {
            errors.push(ValidationError {
                field: "poll_interval_minutes".to_string(),
                message: format!(
                    "poll interval must be between {} and {} minutes, got {}",
                    MIN_POLL_INTERVAL_MINUTES, MAX_POLL_INTERVAL_MINUTES, self.poll_interval_minutes
                ),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// A single validation failure.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The configuration field that failed.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            base_url: "https://example.supabase.co".to_string(),
            api_key: "key".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.table, "PMSensor");
        assert_eq!(config.time_column, "Measure_time");
        assert_eq!(config.page_limit, 1000);
        assert_eq!(config.poll_interval_minutes, 5);
    }

    #[test]
    fn test_valid_config_passes() {
        valid_config().validate().unwrap();
    }

    #[test]
    fn test_empty_config_collects_errors() {
        let err = Config::default().validate().unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert!(errors.iter().any(|e| e.field == "base_url"));
                assert!(errors.iter().any(|e| e.field == "api_key"));
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_rejects_non_http_url() {
        let config = Config {
            base_url: "ftp://example.com".to_string(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_poll_interval() {
        let config = Config {
            poll_interval_minutes: 0,
            ..valid_config()
        };
        assert!(config.validate().is_err());

        let config = Config {
            poll_interval_minutes: 24 * 60 + 1,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airsync.toml");

        let config = valid_config();
        config.save(&path).unwrap();

        let loaded = Config::load_validated(&path).unwrap();
        assert_eq!(loaded.base_url, config.base_url);
        assert_eq!(loaded.page_limit, config.page_limit);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/airsync.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
