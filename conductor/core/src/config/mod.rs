//! TOML Configuration File Support
//!
//! Configuration for the game controller and its service clients, loaded
//! from `~/.config/ai-image-hunter/hunter.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [backend]
//! base_url = "http://localhost:8000"
//! timeout_secs = 120
//!
//! [image_source]
//! api_base = "https://api.unsplash.com"
//! access_key = "your-access-key"
//! top_n = 10
//! app_name = "ai_image_hunter"
//!
//! [game]
//! round_limit = 5
//! default_model = "ollama"
//!
//! [daemon]
//! socket_path = "/run/user/1000/ai-image-hunter/hunter.sock"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::ModelChoice;
use crate::session::DEFAULT_ROUND_LIMIT;

/// Default game backend
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[backend]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendToml {
    /// Game backend base URL
    pub base_url: Option<String>,

    /// HTTP request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// `[image_source]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSourceToml {
    /// Unsplash API base URL
    pub api_base: Option<String>,

    /// Unsplash access key
    pub access_key: Option<String>,

    /// Number of top results to pick from
    pub top_n: Option<usize>,

    /// Application name for referral links
    pub app_name: Option<String>,
}

/// `[game]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameToml {
    /// Rounds per session
    pub round_limit: Option<usize>,

    /// Model used until the player picks another
    pub default_model: Option<String>,
}

/// `[daemon]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonToml {
    /// Unix socket path
    pub socket_path: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HunterToml {
    /// Game backend section
    pub backend: BackendToml,

    /// Image source section
    pub image_source: ImageSourceToml,

    /// Game rules section
    pub game: GameToml,

    /// Daemon section
    pub daemon: DaemonToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration
#[derive(Clone, Debug)]
pub struct HunterConfig {
    /// Game backend base URL
    pub backend_url: String,

    /// HTTP request timeout
    pub http_timeout: Duration,

    /// Unsplash API base URL
    pub unsplash_api_base: String,

    /// Unsplash access key; fetches fail without one
    pub unsplash_access_key: Option<String>,

    /// Number of top search results to pick from
    pub top_n: usize,

    /// Application name for referral links
    pub app_name: String,

    /// Rounds per session
    pub round_limit: usize,

    /// Initial prompt model
    pub default_model: ModelChoice,

    /// Daemon socket path (falls back to [`default_socket_path`])
    pub socket_path: Option<PathBuf>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for HunterConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            http_timeout: crate::backend::DEFAULT_TIMEOUT,
            unsplash_api_base: crate::backend::DEFAULT_API_BASE.to_string(),
            unsplash_access_key: None,
            top_n: crate::backend::DEFAULT_TOP_N,
            app_name: crate::backend::DEFAULT_APP_NAME.to_string(),
            round_limit: DEFAULT_ROUND_LIMIT,
            default_model: ModelChoice::default(),
            socket_path: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl HunterConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Socket path to listen on
    #[must_use]
    pub fn resolved_socket_path(&self) -> PathBuf {
        self.socket_path.clone().unwrap_or_else(default_socket_path)
    }

    /// Check values that would make the game unplayable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a zero round limit, zero
    /// `top_n` or an empty backend URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.round_limit == 0 {
            return Err(ConfigError::ValidationError(
                "round_limit must be at least 1".into(),
            ));
        }
        if self.top_n == 0 {
            return Err(ConfigError::ValidationError(
                "top_n must be at least 1".into(),
            ));
        }
        if self.backend_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "backend base_url must not be empty".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/ai-image-hunter/hunter.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ai-image-hunter").join("hunter.toml"))
}

/// Default daemon socket: `$XDG_RUNTIME_DIR/ai-image-hunter/hunter.sock`,
/// or the temp dir when there is no runtime dir
#[must_use]
pub fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ai-image-hunter")
        .join("hunter.sock")
}

fn parse_model(value: &str) -> Result<ModelChoice, ConfigError> {
    value.parse().map_err(ConfigError::ValidationError)
}

/// Load configuration from the default path, environment and defaults
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the result fails validation.
pub fn load_config() -> Result<HunterConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// A missing file is not an error (defaults are used).
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if a value is
/// invalid.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<HunterConfig, ConfigError> {
    let mut config = HunterConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: HunterToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut HunterConfig, toml: &HunterToml) -> Result<(), ConfigError> {
    if let Some(ref url) = toml.backend.base_url {
        config.backend_url = url.clone();
    }
    if let Some(secs) = toml.backend.timeout_secs {
        config.http_timeout = Duration::from_secs(secs);
    }

    if let Some(ref base) = toml.image_source.api_base {
        config.unsplash_api_base = base.clone();
    }
    if toml.image_source.access_key.is_some() {
        config.unsplash_access_key = toml.image_source.access_key.clone();
    }
    if let Some(n) = toml.image_source.top_n {
        config.top_n = n;
    }
    if let Some(ref name) = toml.image_source.app_name {
        config.app_name = name.clone();
    }

    if let Some(limit) = toml.game.round_limit {
        config.round_limit = limit;
    }
    if let Some(ref model) = toml.game.default_model {
        config.default_model = parse_model(model)?;
    }

    if let Some(ref path) = toml.daemon.socket_path {
        config.socket_path = Some(PathBuf::from(path));
    }
    Ok(())
}

/// Apply environment variable overrides
///
/// Unparseable numbers are ignored; an unknown model name is an error.
fn apply_env_config(
    config: &mut HunterConfig,
    var: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(url) = var("HUNTER_BACKEND_URL") {
        config.backend_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = var("HUNTER_HTTP_TIMEOUT") {
        if let Ok(secs) = timeout.parse::<u64>() {
            config.http_timeout = Duration::from_secs(secs);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(key) = var("UNSPLASH_ACCESS_KEY") {
        config.unsplash_access_key = Some(key);
        config.source = ConfigSource::Env;
    }
    if let Some(base) = var("UNSPLASH_API_BASE") {
        config.unsplash_api_base = base;
        config.source = ConfigSource::Env;
    }
    if let Some(top_n) = var("HUNTER_TOP_N") {
        if let Ok(n) = top_n.parse::<usize>() {
            config.top_n = n;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(limit) = var("HUNTER_ROUND_LIMIT") {
        if let Ok(n) = limit.parse::<usize>() {
            config.round_limit = n;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(model) = var("HUNTER_DEFAULT_MODEL") {
        config.default_model = parse_model(&model)?;
        config.source = ConfigSource::Env;
    }
    if let Some(path) = var("HUNTER_SOCKET") {
        config.socket_path = Some(PathBuf::from(path));
        config.source = ConfigSource::Env;
    }
    Ok(())
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Backend URL override
    pub backend_url: Option<String>,

    /// Default model override
    pub default_model: Option<ModelChoice>,

    /// Socket path override
    pub socket_path: Option<PathBuf>,

    /// Round limit override
    pub round_limit: Option<usize>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set backend URL override
    #[must_use]
    pub fn with_backend_url(mut self, url: String) -> Self {
        self.backend_url = Some(url);
        self
    }

    /// Set default model override
    #[must_use]
    pub fn with_default_model(mut self, model: ModelChoice) -> Self {
        self.default_model = Some(model);
        self
    }

    /// Set socket path override
    #[must_use]
    pub fn with_socket_path(mut self, path: PathBuf) -> Self {
        self.socket_path = Some(path);
        self
    }

    /// Set round limit override
    #[must_use]
    pub fn with_round_limit(mut self, limit: usize) -> Self {
        self.round_limit = Some(limit);
        self
    }

    /// Apply overrides to a configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the result is invalid.
    pub fn apply(&self, config: &mut HunterConfig) -> Result<(), ConfigError> {
        if self.backend_url.is_some()
            || self.default_model.is_some()
            || self.socket_path.is_some()
            || self.round_limit.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(model) = self.default_model {
            config.default_model = model;
        }
        if let Some(ref path) = self.socket_path {
            config.socket_path = Some(path.clone());
        }
        if let Some(limit) = self.round_limit {
            config.round_limit = limit;
        }
        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_toml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = HunterConfig::default();
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.round_limit, 5);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.default_model, ModelChoice::Ollama);
        assert!(config.unsplash_access_key.is_none());
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.ends_with("ai-image-hunter/hunter.toml"));
        }
        assert!(default_socket_path().ends_with("ai-image-hunter/hunter.sock"));
    }

    #[test]
    fn test_parse_valid_toml() {
        let file = write_toml(
            r#"
[backend]
base_url = "http://game.local:9000"
timeout_secs = 30

[image_source]
access_key = "abc123"
top_n = 3
app_name = "hunter_test"

[game]
round_limit = 3
default_model = "gemini"

[daemon]
socket_path = "/tmp/hunter-test.sock"
"#,
        );

        let mut config = HunterConfig::default();
        let toml: HunterToml = toml::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        apply_toml_config(&mut config, &toml).unwrap();

        assert_eq!(config.backend_url, "http://game.local:9000");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.unsplash_access_key.as_deref(), Some("abc123"));
        assert_eq!(config.top_n, 3);
        assert_eq!(config.app_name, "hunter_test");
        assert_eq!(config.round_limit, 3);
        assert_eq!(config.default_model, ModelChoice::Gemini);
        assert_eq!(
            config.resolved_socket_path(),
            PathBuf::from("/tmp/hunter-test.sock")
        );
    }

    #[test]
    fn test_load_from_file_sets_source() {
        let file = write_toml("[game]\nround_limit = 4\n");
        let config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.config_file_path.as_deref(), Some(file.path()));
        assert!(matches!(
            config.source(),
            ConfigSource::File | ConfigSource::Env
        ));
    }

    #[test]
    fn test_missing_file_graceful() {
        let path = PathBuf::from("/nonexistent/path/hunter.toml");
        let config = load_config_from_path(Some(path)).unwrap();
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_malformed_toml_error() {
        let file = write_toml("[game\nround_limit = \"five\"\n");
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_unknown_model_in_file_is_rejected() {
        let file = write_toml("[game]\ndefault_model = \"eliza\"\n");
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result.unwrap_err(), ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_zero_round_limit_is_rejected() {
        let file = write_toml("[game]\nround_limit = 0\n");
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result.unwrap_err(), ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = HunterConfig::default();
        let toml: HunterToml =
            toml::from_str("[backend]\nbase_url = \"http://file\"\n[game]\ndefault_model = \"openai\"\n")
                .unwrap();
        apply_toml_config(&mut config, &toml).unwrap();
        config.set_source(ConfigSource::File);

        apply_env_config(
            &mut config,
            env_of(&[
                ("HUNTER_BACKEND_URL", "http://env"),
                ("HUNTER_TOP_N", "not-a-number"),
                ("UNSPLASH_ACCESS_KEY", "env-key"),
            ]),
        )
        .unwrap();

        assert_eq!(config.backend_url, "http://env");
        assert_eq!(config.default_model, ModelChoice::OpenAi);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.unsplash_access_key.as_deref(), Some("env-key"));
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_env_unknown_model_errors() {
        let mut config = HunterConfig::default();
        let result = apply_env_config(&mut config, env_of(&[("HUNTER_DEFAULT_MODEL", "bard")]));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_empty_env_leaves_source() {
        let mut config = HunterConfig::default();
        apply_env_config(&mut config, env_of(&[])).unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = HunterConfig::default();
        config.default_model = ModelChoice::OpenAi;
        config.set_source(ConfigSource::Env);

        ConfigOverrides::new()
            .with_default_model(ModelChoice::Gemini)
            .with_backend_url("http://cli".to_string())
            .apply(&mut config)
            .unwrap();

        assert_eq!(config.default_model, ModelChoice::Gemini);
        assert_eq!(config.backend_url, "http://cli");
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_config_overrides_empty_no_change() {
        let mut config = HunterConfig::default();
        ConfigOverrides::new().apply(&mut config).unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_config_overrides_validate() {
        let mut config = HunterConfig::default();
        let result = ConfigOverrides::new().with_round_limit(0).apply(&mut config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::Cli), "CLI");
        assert_eq!(format!("{}", ConfigSource::Env), "environment");
        assert_eq!(format!("{}", ConfigSource::File), "config file");
        assert_eq!(format!("{}", ConfigSource::Default), "default");
    }

    #[test]
    fn test_config_error_display() {
        let read_err = ConfigError::ReadError {
            path: PathBuf::from("/test/path"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let msg = format!("{read_err}");
        assert!(msg.contains("/test/path"));
        assert!(msg.contains("Failed to read"));
    }
}
