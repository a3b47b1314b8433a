//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::analysis::knowledge::{Band, HiveType, KnowledgeBase};
use crate::store::{BEE_COUNT, HONEY_YIELD, HUMIDITY, TEMPERATURE};
use chrono::Duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "HIVESIGHT_";

/// Longest retention or lookback window accepted, about a century
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub trends: TrendsConfig,

    #[serde(default)]
    pub correlation: CorrelationConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub denylist: DenylistConfig,

    #[serde(default)]
    pub progress: ProgressConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub knowledge: KnowledgeBase,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Retention windows for the observation stores
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Short-horizon cache backing historical analysis and forecasts
    #[serde(default = "default_data_cache_days")]
    pub data_cache_days: i64,

    /// Long-horizon history backing trend analysis
    #[serde(default = "default_trend_history_days")]
    pub trend_history_days: i64,
}

fn default_data_cache_days() -> i64 {
    30
}

fn default_trend_history_days() -> i64 {
    365
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            data_cache_days: default_data_cache_days(),
            trend_history_days: default_trend_history_days(),
        }
    }
}

/// Trend analysis thresholds
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrendsConfig {
    #[serde(default = "default_minimum_observations")]
    pub minimum_observations: usize,

    /// Relative change beyond which a trend is increasing or decreasing
    #[serde(default = "default_significant_change")]
    pub significant_change: f64,

    #[serde(default = "default_activity_window_days")]
    pub activity_window_days: i64,

    #[serde(default = "default_activity_metric")]
    pub activity_metric: String,

    #[serde(default = "default_yield_metric")]
    pub yield_metric: String,

    #[serde(default = "default_seasonal_variation_alert")]
    pub seasonal_variation_alert: f64,

    #[serde(default)]
    pub hive_type: HiveType,
}

fn default_minimum_observations() -> usize {
    5
}

fn default_significant_change() -> f64 {
    0.20
}

fn default_activity_window_days() -> i64 {
    30
}

fn default_activity_metric() -> String {
    BEE_COUNT.to_string()
}

fn default_yield_metric() -> String {
    HONEY_YIELD.to_string()
}

fn default_seasonal_variation_alert() -> f64 {
    0.5
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            minimum_observations: default_minimum_observations(),
            significant_change: default_significant_change(),
            activity_window_days: default_activity_window_days(),
            activity_metric: default_activity_metric(),
            yield_metric: default_yield_metric(),
            seasonal_variation_alert: default_seasonal_variation_alert(),
            hive_type: HiveType::default(),
        }
    }
}

/// Metrics correlated pairwise
#[derive(Debug, Clone, Deserialize)]
pub struct CorrelationConfig {
    #[serde(default = "default_correlation_metrics")]
    pub metrics: Vec<String>,
}

fn default_correlation_metrics() -> Vec<String> {
    [BEE_COUNT, HONEY_YIELD, HUMIDITY, TEMPERATURE]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            metrics: default_correlation_metrics(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    #[serde(default = "default_window_secs")]
    pub window_secs: i64,
}

fn default_max_requests() -> usize {
    60
}

fn default_window_secs() -> i64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: i64,
}

fn default_timeout_minutes() -> i64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: default_timeout_minutes(),
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::minutes(self.timeout_minutes)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DenylistConfig {
    #[serde(default = "default_ttl_days")]
    pub default_ttl_days: i64,
}

fn default_ttl_days() -> i64 {
    30
}

impl Default for DenylistConfig {
    fn default() -> Self {
        Self {
            default_ttl_days: default_ttl_days(),
        }
    }
}

impl DenylistConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::days(self.default_ttl_days)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressConfig {
    /// Minutes a completed or failed job stays queryable
    #[serde(default = "default_finished_retention_minutes")]
    pub finished_retention_minutes: i64,
}

fn default_finished_retention_minutes() -> i64 {
    60
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            finished_retention_minutes: default_finished_retention_minutes(),
        }
    }
}

impl ProgressConfig {
    pub fn finished_retention(&self) -> Duration {
        Duration::minutes(self.finished_retention_minutes)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,

    #[serde(default = "default_housekeeping_interval")]
    pub housekeeping_interval_secs: u64,
}

fn default_id_prefix() -> String {
    "BEE".to_string()
}

fn default_housekeeping_interval() -> u64 {
    300 // 5 minutes
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            id_prefix: default_id_prefix(),
            housekeeping_interval_secs: default_housekeeping_interval(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "pretty" or "json"
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

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
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
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("hivesight").join("config.toml")),
            Some(PathBuf::from("/etc/hivesight/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(format!("{}{}", ENV_PREFIX, name)).ok());
    }

    /// Apply overrides from `lookup`, keyed by variable name without prefix
    ///
    /// Unparseable numeric values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
            value.and_then(|v| v.trim().parse().ok())
        }

        if let Some(days) = parsed(lookup("DATA_CACHE_DAYS")) {
            self.retention.data_cache_days = days;
        }
        if let Some(days) = parsed(lookup("TREND_HISTORY_DAYS")) {
            self.retention.trend_history_days = days;
        }
        if let Some(max) = parsed(lookup("RATE_LIMIT_MAX_REQUESTS")) {
            self.rate_limit.max_requests = max;
        }
        if let Some(secs) = parsed(lookup("RATE_LIMIT_WINDOW_SECS")) {
            self.rate_limit.window_secs = secs;
        }
        if let Some(minutes) = parsed(lookup("SESSION_TIMEOUT_MINUTES")) {
            self.session.timeout_minutes = minutes;
        }
        if let Some(prefix) = lookup("REPORT_ID_PREFIX") {
            self.report.id_prefix = prefix;
        }

        // Logging overrides
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Reject values the core cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let windows = [
            ("retention.data_cache_days", self.retention.data_cache_days, MAX_WINDOW_DAYS),
            ("retention.trend_history_days", self.retention.trend_history_days, MAX_WINDOW_DAYS),
            ("trends.activity_window_days", self.trends.activity_window_days, MAX_WINDOW_DAYS),
            ("rate_limit.window_secs", self.rate_limit.window_secs, MAX_WINDOW_DAYS * 86_400),
            ("session.timeout_minutes", self.session.timeout_minutes, MAX_WINDOW_DAYS * 1_440),
            ("denylist.default_ttl_days", self.denylist.default_ttl_days, MAX_WINDOW_DAYS),
            (
                "progress.finished_retention_minutes",
                self.progress.finished_retention_minutes,
                MAX_WINDOW_DAYS * 1_440,
            ),
        ];
        for (field, value, max) in windows {
            if value <= 0 {
                return Err(ConfigError::invalid(field, "must be greater than zero"));
            }
            if value > max {
                return Err(ConfigError::invalid(field, &format!("must not exceed {}", max)));
            }
        }

        if self.trends.minimum_observations == 0 {
            return Err(ConfigError::invalid("trends.minimum_observations", "must be at least 1"));
        }
        if !(self.trends.significant_change >= 0.0) {
            return Err(ConfigError::invalid("trends.significant_change", "must not be negative"));
        }
        if self.trends.activity_metric.trim().is_empty() || self.trends.yield_metric.trim().is_empty() {
            return Err(ConfigError::invalid("trends", "metric names must not be empty"));
        }
        if self.correlation.metrics.iter().any(|m| m.trim().is_empty()) {
            return Err(ConfigError::invalid("correlation.metrics", "metric names must not be empty"));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::invalid("rate_limit.max_requests", "must be at least 1"));
        }
        if self.report.housekeeping_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "report.housekeeping_interval_secs",
                "must be greater than zero",
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::invalid("logging.format", "must be \"pretty\" or \"json\""));
        }

        let kb = &self.knowledge;
        let bands: [(&str, Band); 4] = [
            ("knowledge.temperature_optimal", kb.temperature_optimal),
            ("knowledge.modern_hive_yield", kb.modern_hive_yield),
            ("knowledge.traditional_hive_yield", kb.traditional_hive_yield),
            ("knowledge.humidity_comfort", kb.humidity_comfort),
        ];
        for (field, band) in bands {
            if !(band.min <= band.max) {
                return Err(ConfigError::invalid(field, "min must not exceed max"));
            }
        }
        if kb.activity_medium > kb.activity_high {
            return Err(ConfigError::invalid(
                "knowledge.activity_medium",
                "must not exceed activity_high",
            ));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: &str) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Hivesight Configuration
#
# Environment variables override these settings:
# - HIVESIGHT_DATA_CACHE_DAYS
# - HIVESIGHT_TREND_HISTORY_DAYS
# - HIVESIGHT_RATE_LIMIT_MAX_REQUESTS
# - HIVESIGHT_RATE_LIMIT_WINDOW_SECS
# - HIVESIGHT_SESSION_TIMEOUT_MINUTES
# - HIVESIGHT_REPORT_ID_PREFIX
# - HIVESIGHT_LOG_LEVEL
# - HIVESIGHT_LOG_FORMAT

[retention]
# Days of observations kept for historical analysis and forecasts
data_cache_days = 30

# Days of observations kept for trend analysis
trend_history_days = 365

[trends]
# Observations required before trends are computed
minimum_observations = 5

# Relative change that counts as increasing or decreasing
significant_change = 0.20

# Window for the activity trend (days)
activity_window_days = 30

# Metric names for activity and yield
activity_metric = "bee_count"
yield_metric = "honey_yield"

# Coefficient of variation across months that triggers seasonal advice
seasonal_variation_alert = 0.5

# Hive construction: modern or traditional
hive_type = "modern"

[correlation]
# Metrics correlated pairwise
metrics = ["bee_count", "honey_yield", "humidity", "temperature"]

[rate_limit]
# Requests allowed per user per window
max_requests = 60
window_secs = 60

[session]
# Minutes of inactivity before a session expires
timeout_minutes = 60

[denylist]
# Default lifetime of a revoked token (days)
default_ttl_days = 30

[progress]
# Minutes a finished analysis job stays queryable
finished_retention_minutes = 60

[report]
# Prefix for report ids: <prefix>-<user>-<YYYYMMDDHHMM>
id_prefix = "BEE"

# How often expired entries are swept (seconds)
housekeeping_interval_secs = 300

[knowledge]
# Optimal foraging temperature (Celsius)
temperature_optimal = { min = 20.0, max = 35.0 }
temperature_too_cold = 10.0
temperature_too_hot = 40.0

# Weather conditions considered good for foraging
favorable_weather = ["clear_sky", "partial_clouds", "light_wind", "no_rain"]

# Optimal honey yield per harvest (kg)
modern_hive_yield = { min = 15.0, max = 25.0 }
traditional_hive_yield = { min = 8.0, max = 15.0 }

# Forager activity thresholds (bees per minute)
activity_high = 40.0
activity_medium = 20.0

# Comfortable relative humidity (percent)
humidity_comfort = { min = 30.0, max = 80.0 }

# Furthest acceptable distance to water (metres)
max_water_distance = 3000.0

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
