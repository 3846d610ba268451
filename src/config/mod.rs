//! Configuration management for toxiscan
//!
//! Loading, validation, and env-var overrides for the detection client and
//! pipeline knobs. The config file owns everything the extension's storage
//! layer would persist; [`PipelineSettings`] snapshots are derived from it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToxiscanError};
use crate::pipeline::PipelineOptions;
use crate::platform::Platform;
use crate::settings::PipelineSettings;

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub api: ApiConfig,
    pub detection: DetectionConfig,
    pub render: RenderConfig,
    /// Per-platform switches; platforms missing from the map are enabled
    #[serde(default)]
    pub platforms: HashMap<String, bool>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Remote detection service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL; `/detect` and `/detect/batch` are appended
    pub endpoint: String,
    /// Environment variable holding the bearer token
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl ApiConfig {
    /// Bearer token from the configured environment variable, if set
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Candidate gating configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Master switch
    pub enabled: bool,
    /// Candidates shorter than this are discarded silently
    pub min_comment_length: usize,
    /// Mutation channel capacity
    pub mutation_buffer: usize,
}

/// Indicator rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub highlight_threshold: f32,
    pub highlight_enabled: bool,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ToxiscanError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ToxiscanError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ToxiscanError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: TOXISCAN_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("TOXISCAN_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "API__ENDPOINT" => {
                self.api.endpoint = value.to_string();
            }
            "API__TIMEOUT_SECS" => {
                self.api.timeout_secs = parse_env(path, value)?;
            }
            "DETECTION__ENABLED" => {
                self.detection.enabled = parse_env(path, value)?;
            }
            "DETECTION__MIN_COMMENT_LENGTH" => {
                self.detection.min_comment_length = parse_env(path, value)?;
            }
            "RENDER__HIGHLIGHT_THRESHOLD" => {
                self.render.highlight_threshold = parse_env(path, value)?;
            }
            "RENDER__HIGHLIGHT_ENABLED" => {
                self.render.highlight_enabled = parse_env(path, value)?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Whether the per-platform switch allows this platform
    pub fn platform_enabled(&self, platform: Platform) -> bool {
        self.platforms
            .get(platform.as_str())
            .copied()
            .unwrap_or(true)
    }

    /// Derive the pipeline settings snapshot for one platform.
    /// `authenticated` starts false; the auth provider fills it in.
    pub fn settings_for(&self, platform: Platform) -> PipelineSettings {
        PipelineSettings {
            enabled: self.detection.enabled,
            platform_enabled: self.platform_enabled(platform),
            authenticated: false,
            highlight_threshold: self.render.highlight_threshold,
            highlight_enabled: self.render.highlight_enabled,
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            min_comment_length: self.detection.min_comment_length,
            ..Default::default()
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ToxiscanError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("toxiscan").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            api: ApiConfig {
                endpoint: "http://127.0.0.1:8000/api".to_string(),
                api_key_env: "TOXISCAN_API_TOKEN".to_string(),
                timeout_secs: 20,
                connect_timeout_secs: 10,
            },
            detection: DetectionConfig {
                enabled: true,
                min_comment_length: 5,
                mutation_buffer: 256,
            },
            render: RenderConfig {
                highlight_threshold: 0.7,
                highlight_enabled: true,
            },
            platforms: HashMap::new(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| ToxiscanError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_platform_switches_default_enabled() {
        let mut config = Config::default();
        assert!(config.platform_enabled(Platform::Facebook));

        config.platforms.insert("facebook".to_string(), false);
        assert!(!config.platform_enabled(Platform::Facebook));
        assert!(config.platform_enabled(Platform::Youtube));
    }

    #[test]
    fn test_settings_for_platform() {
        let mut config = Config::default();
        config.platforms.insert("tiktok".to_string(), false);

        let settings = config.settings_for(Platform::Tiktok);
        assert!(settings.enabled);
        assert!(!settings.platform_enabled);
        assert!(!settings.authenticated);
        assert!((settings.highlight_threshold - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.detection.min_comment_length = 8;
        config.platforms.insert("youtube".to_string(), false);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.detection.min_comment_length, 8);
        assert!(!loaded.platform_enabled(Platform::Youtube));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/toxiscan.toml"));
        assert!(matches!(err, Err(ToxiscanError::ConfigNotFound { .. })));
    }
}
