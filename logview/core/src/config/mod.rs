//! TOML Configuration File Support
//!
//! Loads viewer configuration from `~/.config/logview/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables (`LOGVIEW_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! The configuration file follows XDG Base Directory specification:
//! - `$XDG_CONFIG_HOME/logview/config.toml` (typically `~/.config/logview/config.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [stream]
//! endpoint = "wss://console.example.com/api/v1/logs/stream"
//! connect_timeout_ms = 5000
//! initial_connect_delay_ms = 100
//!
//! [discovery]
//! api_base = "https://console.example.com"
//! timeout_ms = 10000
//!
//! [display]
//! timestamps = false
//! wrap = false
//! scrollback_lines = 10000
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::selection::DisplayDefaults;
use crate::surface::{CellMetrics, DEFAULT_SCROLLBACK_LINES};
use crate::viewer::ViewerSettings;

/// Default streaming endpoint
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:4654/api/v1/logs/stream";

/// Default discovery API base
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:4654";

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

/// Stream section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamToml {
    /// WebSocket endpoint of the log multiplexer
    pub endpoint: Option<String>,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Delay before the first connection after opening, in milliseconds
    pub initial_connect_delay_ms: Option<u64>,
}

/// Discovery section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryToml {
    /// Base URL of the pod listing API
    pub api_base: Option<String>,

    /// Request timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

/// Display section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayToml {
    /// Show timestamps by default
    pub timestamps: Option<bool>,

    /// Wrap long lines by default
    pub wrap: Option<bool>,

    /// Lines kept in scrollback
    pub scrollback_lines: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogviewToml {
    /// Stream configuration section
    pub stream: StreamToml,

    /// Discovery configuration section
    pub discovery: DiscoveryToml,

    /// Display configuration section
    pub display: DisplayToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved viewer configuration
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct LogviewConfig {
    /// WebSocket endpoint of the log multiplexer
    pub endpoint: String,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Delay between opening the viewer and the first connection
    pub initial_connect_delay: Duration,

    /// Base URL of the pod listing API
    pub api_base: String,

    /// Discovery request timeout
    pub discovery_timeout: Duration,

    /// Display toggles a viewer opens with
    pub display: DisplayDefaults,

    /// Lines kept in scrollback
    pub scrollback_lines: usize,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for LogviewConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: Duration::from_millis(5000),
            initial_connect_delay: Duration::from_millis(100),
            api_base: DEFAULT_API_BASE.to_string(),
            discovery_timeout: Duration::from_secs(10),
            display: DisplayDefaults::default(),
            scrollback_lines: DEFAULT_SCROLLBACK_LINES,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl LogviewConfig {
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

    /// Viewer settings derived from this configuration
    #[must_use]
    pub fn viewer_settings(&self) -> ViewerSettings {
        ViewerSettings {
            initial_connect_delay: self.initial_connect_delay,
            scrollback_lines: self.scrollback_lines,
            display: self.display,
            cell_metrics: CellMetrics::default(),
        }
    }

    /// Check values that cannot be fixed up silently
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a non-WebSocket endpoint,
    /// a non-HTTP discovery base or an empty scrollback.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = Url::parse(&self.endpoint).map_err(|e| {
            ConfigError::ValidationError(format!("stream endpoint {:?}: {e}", self.endpoint))
        })?;
        if !matches!(endpoint.scheme(), "ws" | "wss") {
            return Err(ConfigError::ValidationError(format!(
                "stream endpoint must use ws:// or wss://, got {}://",
                endpoint.scheme()
            )));
        }

        let api_base = Url::parse(&self.api_base).map_err(|e| {
            ConfigError::ValidationError(format!("discovery api_base {:?}: {e}", self.api_base))
        })?;
        if !matches!(api_base.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "discovery api_base must use http:// or https://, got {}://",
                api_base.scheme()
            )));
        }

        if self.scrollback_lines == 0 {
            return Err(ConfigError::ValidationError(
                "scrollback_lines must be greater than zero".to_string(),
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
/// Returns `$XDG_CONFIG_HOME/logview/config.toml` or
/// `~/.config/logview/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("logview").join("config.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<LogviewConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// If `path` is `None`, only defaults and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<LogviewConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration reading environment values through `env`
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<LogviewConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = LogviewConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: LogviewToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
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

    apply_env_config(&mut config, env);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut LogviewConfig, toml: &LogviewToml) {
    if let Some(ref endpoint) = toml.stream.endpoint {
        config.endpoint.clone_from(endpoint);
    }
    if let Some(ms) = toml.stream.connect_timeout_ms {
        config.connect_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.stream.initial_connect_delay_ms {
        config.initial_connect_delay = Duration::from_millis(ms);
    }

    if let Some(ref api_base) = toml.discovery.api_base {
        config.api_base.clone_from(api_base);
    }
    if let Some(ms) = toml.discovery.timeout_ms {
        config.discovery_timeout = Duration::from_millis(ms);
    }

    if let Some(timestamps) = toml.display.timestamps {
        config.display.timestamps = timestamps;
    }
    if let Some(wrap) = toml.display.wrap {
        config.display.wrap = wrap;
    }
    if let Some(lines) = toml.display.scrollback_lines {
        config.scrollback_lines = lines;
    }
}

fn parse_flag(value: &str) -> bool {
    value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut LogviewConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(endpoint) = env("LOGVIEW_ENDPOINT") {
        config.endpoint = endpoint;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = env("LOGVIEW_CONNECT_TIMEOUT_MS") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.connect_timeout = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(delay) = env("LOGVIEW_CONNECT_DELAY_MS") {
        if let Ok(ms) = delay.parse::<u64>() {
            config.initial_connect_delay = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(api_base) = env("LOGVIEW_API_BASE") {
        config.api_base = api_base;
        config.source = ConfigSource::Env;
    }
    if let Some(timestamps) = env("LOGVIEW_TIMESTAMPS") {
        config.display.timestamps = parse_flag(&timestamps);
        config.source = ConfigSource::Env;
    }
    if let Some(wrap) = env("LOGVIEW_WRAP") {
        config.display.wrap = parse_flag(&wrap);
        config.source = ConfigSource::Env;
    }
    if let Some(lines) = env("LOGVIEW_SCROLLBACK") {
        if let Ok(n) = lines.parse::<usize>() {
            config.scrollback_lines = n;
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Stream endpoint override
    pub endpoint: Option<String>,

    /// Connect timeout override (milliseconds)
    pub connect_timeout_ms: Option<u64>,

    /// Discovery API base override
    pub api_base: Option<String>,

    /// Timestamps default override
    pub timestamps: Option<bool>,

    /// Wrap default override
    pub wrap: Option<bool>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set endpoint override
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Set connect timeout override
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = Some(ms);
        self
    }

    /// Set discovery API base override
    #[must_use]
    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = Some(api_base);
        self
    }

    /// Set timestamps override
    #[must_use]
    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = Some(enabled);
        self
    }

    /// Set wrap override
    #[must_use]
    pub fn with_wrap(mut self, enabled: bool) -> Self {
        self.wrap = Some(enabled);
        self
    }

    fn is_empty(&self) -> bool {
        self.endpoint.is_none()
            && self.connect_timeout_ms.is_none()
            && self.api_base.is_none()
            && self.timestamps.is_none()
            && self.wrap.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut LogviewConfig) {
        if self.is_empty() {
            return;
        }
        config.source = ConfigSource::Cli;

        if let Some(ref endpoint) = self.endpoint {
            config.endpoint.clone_from(endpoint);
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ref api_base) = self.api_base {
            config.api_base.clone_from(api_base);
        }
        if let Some(enabled) = self.timestamps {
            config.display.timestamps = enabled;
        }
        if let Some(enabled) = self.wrap {
            config.display.wrap = enabled;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
