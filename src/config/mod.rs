//! Configuration management.
//!
//! Settings are read from a TOML file layered with environment variables
//! prefixed `PDF_HIGHLIGHTER_` (nested keys use `__`, for example
//! `PDF_HIGHLIGHTER_CHUNKING__MAX_CHUNK_SIZE=1500`).
//!
//! ```toml
//! [service]
//! endpoint = "https://api.groq.com/openai/v1/chat/completions"
//! model = "llama-3.3-70b-versatile"
//!
//! [chunking]
//! max_chunk_size = 3000
//!
//! [highlight]
//! min_phrase_len = 6
//!
//! [retry]
//! max_attempts = 3
//! default_wait_secs = 10.0
//!
//! [pipeline]
//! inter_chunk_delay_secs = 1.0
//! warn_threshold = 5
//! confirm_threshold = 10
//!
//! [logging]
//! level = "warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::utils::RetryPolicy;

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "pdf-highlighter.toml";

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "PDF_HIGHLIGHTER";

/// Environment variable holding the service API key
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Phrase service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Text chunking settings
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Highlighting settings
    #[serde(default)]
    pub highlight: HighlightConfig,

    /// Rate-limit retry settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Orchestration settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Phrase service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// API key; falls back to `GROQ_API_KEY` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured key, else the `GROQ_API_KEY` environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

fn default_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_top_p() -> f32 {
    1.0
}

fn default_timeout_secs() -> u64 {
    60
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Soft upper bound on chunk length, in characters
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

fn default_max_chunk_size() -> usize {
    crate::text::DEFAULT_MAX_CHUNK_SIZE
}

/// Highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// Trimmed phrases shorter than this are ignored
    #[serde(default = "default_min_phrase_len")]
    pub min_phrase_len: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            min_phrase_len: default_min_phrase_len(),
        }
    }
}

fn default_min_phrase_len() -> usize {
    crate::pdf::DEFAULT_MIN_PHRASE_LEN
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per chunk, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait when the service gives no retry hint
    #[serde(default = "default_wait_secs")]
    pub default_wait_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            default_wait_secs: default_wait_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, secs(self.default_wait_secs))
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_wait_secs() -> f64 {
    10.0
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pause between consecutive chunks
    #[serde(default = "default_inter_chunk_delay_secs")]
    pub inter_chunk_delay_secs: f64,

    /// Warn about a long run above this many chunks
    #[serde(default = "default_warn_threshold")]
    pub warn_threshold: usize,

    /// Ask for confirmation above this many chunks
    #[serde(default = "default_confirm_threshold")]
    pub confirm_threshold: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inter_chunk_delay_secs: default_inter_chunk_delay_secs(),
            warn_threshold: default_warn_threshold(),
            confirm_threshold: default_confirm_threshold(),
        }
    }
}

impl PipelineConfig {
    pub fn inter_chunk_delay(&self) -> Duration {
        secs(self.inter_chunk_delay_secs)
    }
}

fn default_inter_chunk_delay_secs() -> f64 {
    1.0
}

fn default_warn_threshold() -> usize {
    5
}

fn default_confirm_threshold() -> usize {
    10
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `text` (default) or `json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Non-negative, finite seconds to a duration
fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl Config {
    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Default per-user config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pdf-highlighter").join("config.toml"))
}

/// First existing config file: the working directory, then the user config dir
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    default_config_path().filter(|path| path.is_file())
}

/// Load configuration from an optional file plus environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunking.max_chunk_size, 3000);
        assert_eq!(config.highlight.min_phrase_len, 6);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.policy().default_wait, Duration::from_secs(10));
        assert_eq!(config.pipeline.inter_chunk_delay(), Duration::from_secs(1));
        assert_eq!(config.pipeline.warn_threshold, 5);
        assert_eq!(config.pipeline.confirm_threshold, 10);
        assert_eq!(config.service.model, "llama-3.3-70b-versatile");
        assert_eq!(config.service.max_tokens, 1024);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pdf-highlighter.toml");
        std::fs::write(
            &path,
            r#"
[chunking]
max_chunk_size = 1200

[retry]
default_wait_secs = 2.5

[logging]
level = "debug"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.chunking.max_chunk_size, 1200);
        assert_eq!(config.retry.policy().default_wait, Duration::from_millis(2500));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.highlight.min_phrase_len, 6);
    }

    #[test]
    fn test_environment_override() {
        std::env::set_var("PDF_HIGHLIGHTER_PIPELINE__WARN_THRESHOLD", "7");
        let config = load_config(None).unwrap();
        std::env::remove_var("PDF_HIGHLIGHTER_PIPELINE__WARN_THRESHOLD");

        assert_eq!(config.pipeline.warn_threshold, 7);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.highlight.min_phrase_len = 9;
        config.service.api_key = Some("saved-key".to_string());
        config.save(&path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.highlight.min_phrase_len, 9);
        assert_eq!(loaded.service.api_key.as_deref(), Some("saved-key"));
        assert_eq!(loaded.service.resolve_api_key().as_deref(), Some("saved-key"));
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        std::fs::write(&path, "invalid = toml = content").unwrap();

        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_negative_durations_clamp_to_zero() {
        let pipeline = PipelineConfig {
            inter_chunk_delay_secs: -1.0,
            ..PipelineConfig::default()
        };
        assert_eq!(pipeline.inter_chunk_delay(), Duration::ZERO);
    }
}
