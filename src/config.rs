//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::refresh::RefreshConfig;
use crate::source::SourceMode;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub refresh: RefreshSettings,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Reading source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_mode")]
    pub mode: SourceMode,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default)]
    pub synthetic: SyntheticSettings,
}

fn default_source_mode() -> SourceMode {
    SourceMode::Synthetic
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout() -> u64 {
    5000
}

fn default_history_limit() -> usize {
    50
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: default_source_mode(),
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout(),
            history_limit: default_history_limit(),
            synthetic: SyntheticSettings::default(),
        }
    }
}

/// Synthetic generator settings
#[derive(Debug, Clone, Deserialize)]
pub struct SyntheticSettings {
    #[serde(default = "default_spacing")]
    pub spacing_secs: i64,

    #[serde(default = "default_latency")]
    pub latency_ms: u64,

    #[serde(default)]
    pub failure_rate: f64,

    pub seed: Option<u64>,

    #[serde(default = "default_light_min")]
    pub light_min: u32,

    #[serde(default = "default_light_max")]
    pub light_max: u32,
}

fn default_spacing() -> i64 {
    60
}

fn default_light_min() -> u32 {
    30
}

fn default_light_max() -> u32 {
    80
}

fn default_latency() -> u64 {
    100
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            spacing_secs: default_spacing(),
            latency_ms: default_latency(),
            failure_rate: 0.0,
            seed: None,
            light_min: default_light_min(),
            light_max: default_light_max(),
        }
    }
}

/// Refresh loop intervals
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshSettings {
    #[serde(default = "default_current_interval")]
    pub current_interval_ms: u64,

    #[serde(default = "default_history_interval")]
    pub history_interval_ms: u64,
}

fn default_current_interval() -> u64 {
    2000
}

fn default_history_interval() -> u64 {
    10_000
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            current_interval_ms: default_current_interval(),
            history_interval_ms: default_history_interval(),
        }
    }
}

impl RefreshSettings {
    pub fn to_refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            current_interval: Duration::from_millis(self.current_interval_ms.max(1)),
            history_interval: Duration::from_millis(self.history_interval_ms.max(1)),
        }
    }
}

/// Sensor API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Light bounds of the server's own sensor
    #[serde(default)]
    pub light_min: u32,

    #[serde(default = "default_api_light_max")]
    pub light_max: u32,
}

fn default_api_light_max() -> u32 {
    100
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_database() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("sensorboard").join("iot_data.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./iot_data.db".to_string())
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            history_limit: default_history_limit(),
            light_min: 0,
            light_max: default_api_light_max(),
        }
    }
}

/// CSV export configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_output_dir() -> String {
    dirs::download_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string())
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Install the global tracing subscriber. `RUST_LOG` takes precedence
    /// over the configured level.
    pub fn init(&self) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("sensorboard={},tower_http=info", self.level)));

        let registry = tracing_subscriber::registry().with(filter);
        if self.format == "json" {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        } else {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load an explicit file if given, otherwise search default locations
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_with_env(path),
            None => Self::load_default(),
        }
    }

    /// Load from default locations or environment.
    ///
    /// A file that exists but cannot be read or parsed is an error, not a
    /// reason to fall back to defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_first(&Self::search_paths())
    }

    /// Default config locations, in lookup order
    pub fn search_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("sensorboard").join("config.toml")),
            Some(PathBuf::from("/etc/sensorboard/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load the first existing file among `paths`, or defaults with
    /// environment overrides when none exists
    pub fn load_first(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        match paths.iter().find(|path| path.exists()) {
            Some(path) => {
                let config = Self::load_with_env(path)?;
                tracing::info!("Loaded config from {:?}", path);
                Ok(config)
            }
            None => {
                tracing::info!("Using default config with environment overrides");
                Ok(Self::from_env())
            }
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Source overrides
        if let Ok(mode) = std::env::var("SENSORBOARD_SOURCE") {
            match mode.parse() {
                Ok(m) => self.source.mode = m,
                Err(e) => tracing::warn!("Ignoring SENSORBOARD_SOURCE: {}", e),
            }
        }
        if let Ok(url) = std::env::var("SENSORBOARD_SOURCE_URL") {
            self.source.base_url = url;
        }

        // Refresh overrides
        if let Some(ms) = env_parse("SENSORBOARD_CURRENT_INTERVAL_MS") {
            self.refresh.current_interval_ms = ms;
        }
        if let Some(ms) = env_parse("SENSORBOARD_HISTORY_INTERVAL_MS") {
            self.refresh.history_interval_ms = ms;
        }

        // API overrides
        if let Ok(host) = std::env::var("SENSORBOARD_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = env_parse("SENSORBOARD_API_PORT") {
            self.api.port = port;
        }
        if let Ok(db) = std::env::var("SENSORBOARD_DATABASE") {
            self.api.database = db;
        }

        // Export overrides
        if let Ok(dir) = std::env::var("SENSORBOARD_EXPORT_DIR") {
            self.export.output_dir = dir;
        }

        // Logging overrides
        if let Ok(level) = std::env::var("SENSORBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SENSORBOARD_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Sensorboard Configuration
#
# Environment variables override these settings:
# - SENSORBOARD_SOURCE (live | synthetic)
# - SENSORBOARD_SOURCE_URL
# - SENSORBOARD_CURRENT_INTERVAL_MS
# - SENSORBOARD_HISTORY_INTERVAL_MS
# - SENSORBOARD_API_HOST
# - SENSORBOARD_API_PORT
# - SENSORBOARD_DATABASE
# - SENSORBOARD_EXPORT_DIR
# - SENSORBOARD_LOG_LEVEL
# - SENSORBOARD_LOG_FORMAT

[source]
# Where readings come from: "live" (sensor API over HTTP) or "synthetic"
mode = "synthetic"

# Sensor API base URL (live mode)
base_url = "http://localhost:5000"

# Request timeout (ms)
request_timeout_ms = 5000

# Number of readings in a history snapshot
history_limit = 50

[source.synthetic]
# Seconds between generated history readings
spacing_secs = 60

# Simulated fetch latency (ms)
latency_ms = 100

# Probability that a fetch fails (0.0 - 1.0)
failure_rate = 0.0

# Fixed RNG seed for reproducible readings
# seed = 42

# Light level bounds (%)
light_min = 30
light_max = 80

[refresh]
# Current reading refresh interval (ms)
current_interval_ms = 2000

# History, statistics and chart refresh interval (ms)
history_interval_ms = 10000

[api]
# Sensor API server host
host = "0.0.0.0"

# Sensor API server port
port = 5000

# SQLite database file
database = "./iot_data.db"

# Default number of readings returned by /api/history
history_limit = 50

# Light level bounds of the server's sensor (%)
light_min = 0
light_max = 100

[export]
# Directory CSV exports are written to
output_dir = "."

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.source.mode, SourceMode::Synthetic);
        assert_eq!(config.source.history_limit, 50);
        assert_eq!(config.refresh.current_interval_ms, 2000);
        assert_eq!(config.refresh.history_interval_ms, 10_000);
        assert_eq!(config.api.port, 5000);
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::from_toml(&generate_default_config()).unwrap();

        assert_eq!(config.source.base_url, "http://localhost:5000");
        assert_eq!(config.source.synthetic.latency_ms, 100);
        assert_eq!(config.api.database, "./iot_data.db");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!((config.source.synthetic.light_min, config.source.synthetic.light_max), (30, 80));
        assert_eq!((config.api.light_min, config.api.light_max), (0, 100));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [source]
            mode = "live"
            base_url = "http://pi.local:5000"

            [refresh]
            current_interval_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.source.mode, SourceMode::Live);
        assert_eq!(config.source.request_timeout_ms, 5000);
        assert_eq!(config.refresh.current_interval_ms, 500);
        assert_eq!(config.refresh.history_interval_ms, 10_000);

        let refresh = config.refresh.to_refresh_config();
        assert_eq!(refresh.current_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml("[source\nmode = 1"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_malformed_file_in_search_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let broken = dir.path().join("config.toml");
        std::fs::write(&broken, "[refresh\ncurrent_interval_ms = 500").unwrap();

        let result = Config::load_first(&[missing, broken.clone()]);

        match result {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, broken),
            other => panic!("expected parse error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_first_existing_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        std::fs::write(&first, "[api]\nhistory_limit = 7").unwrap();
        std::fs::write(&second, "[api]\nhistory_limit = 9").unwrap();

        let config = Config::load_first(&[dir.path().join("none.toml"), first, second]).unwrap();
        assert_eq!(config.api.history_limit, 7);
    }

    #[test]
    fn test_no_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_first(&[dir.path().join("none.toml")]).unwrap();
        assert_eq!(config.api.port, 5000);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/sensorboard.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
