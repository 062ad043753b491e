use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// Fix filtering and geofence detection thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Fixes with a worse accuracy radius are dropped.
    #[serde(default = "default_min_accuracy")]
    pub min_accuracy_meters: f64,

    /// Fixes closer than this to the previous accepted fix are dropped.
    #[serde(default = "default_min_distance")]
    pub min_distance_meters: f64,

    #[serde(default = "default_recent_fix_buffer_size")]
    pub recent_fix_buffer_size: usize,

    /// Distance outside the current zone's ring still treated as inside. 0 disables.
    #[serde(default = "default_boundary_buffer")]
    pub geofence_boundary_buffer_meters: f64,

    #[serde(default = "default_dwell_threshold")]
    pub dwell_threshold_ms: u64,

    #[serde(default = "default_true")]
    pub dwell_detection_enabled: bool,

    #[serde(default = "default_dwell_check_interval")]
    pub dwell_check_interval_secs: u64,

    #[serde(default = "default_proximity_radius")]
    pub proximity_radius_meters: f64,

    /// How long the positioning source may stay silent before a warning.
    #[serde(default = "default_fix_timeout")]
    pub fix_timeout_ms: u64,

    /// Oldest fix accepted, relative to processing time. 0 disables.
    #[serde(default = "default_max_fix_age")]
    pub max_fix_age_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Oldest records are dropped beyond this many queued updates.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    #[serde(default = "default_sink_timeout")]
    pub sink_timeout_ms: u64,

    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_reload_interval")]
    pub reload_interval_secs: u64,

    /// Timeout for zone store and asset catalog calls.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,

    #[serde(default = "default_asset_page_size")]
    pub asset_page_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Port of the Prometheus scrape endpoint. 0 disables the exporter.
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

/// Fix replay used by the `field-tracker` binary.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    #[serde(default)]
    pub file: String,

    #[serde(default)]
    pub user_id: String,

    #[serde(default)]
    pub farm_id: String,

    /// Delay between fixes that carry no `delayMs` of their own.
    #[serde(default = "default_replay_delay")]
    pub default_delay_ms: u64,
}

// Default value functions
fn default_min_accuracy() -> f64 {
    50.0
}
fn default_min_distance() -> f64 {
    5.0
}
fn default_recent_fix_buffer_size() -> usize {
    10
}
fn default_boundary_buffer() -> f64 {
    10.0
}
fn default_dwell_threshold() -> u64 {
    300_000
}
fn default_true() -> bool {
    true
}
fn default_dwell_check_interval() -> u64 {
    30
}
fn default_proximity_radius() -> f64 {
    50.0
}
fn default_fix_timeout() -> u64 {
    15_000
}
fn default_max_fix_age() -> u64 {
    30_000
}
fn default_batch_size() -> usize {
    5
}
fn default_max_queue_size() -> usize {
    1000
}
fn default_sink_timeout() -> u64 {
    10_000
}
fn default_retry_interval() -> u64 {
    60
}
fn default_reload_interval() -> u64 {
    300
}
fn default_fetch_timeout() -> u64 {
    10_000
}
fn default_asset_page_size() -> usize {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_prometheus_port() -> u16 {
    9464
}
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_replay_delay() -> u64 {
    1000
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_accuracy_meters: default_min_accuracy(),
            min_distance_meters: default_min_distance(),
            recent_fix_buffer_size: default_recent_fix_buffer_size(),
            geofence_boundary_buffer_meters: default_boundary_buffer(),
            dwell_threshold_ms: default_dwell_threshold(),
            dwell_detection_enabled: default_true(),
            dwell_check_interval_secs: default_dwell_check_interval(),
            proximity_radius_meters: default_proximity_radius(),
            fix_timeout_ms: default_fix_timeout(),
            max_fix_age_ms: default_max_fix_age(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_queue_size: default_max_queue_size(),
            sink_timeout_ms: default_sink_timeout(),
            retry_interval_secs: default_retry_interval(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            reload_interval_secs: default_reload_interval(),
            fetch_timeout_ms: default_fetch_timeout(),
            asset_page_size: default_asset_page_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prometheus_port: default_prometheus_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            file: String::new(),
            user_id: String::new(),
            farm_id: String::new(),
            default_delay_ms: default_replay_delay(),
        }
    }
}

impl TrackingConfig {
    pub fn fix_timeout(&self) -> Duration {
        Duration::from_millis(self.fix_timeout_ms)
    }

    pub fn dwell_threshold(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.dwell_threshold_ms as i64)
    }

    pub fn dwell_check_interval(&self) -> Duration {
        Duration::from_secs(self.dwell_check_interval_secs)
    }

    /// `None` when stale fixes are not filtered.
    pub fn max_fix_age(&self) -> Option<chrono::Duration> {
        (self.max_fix_age_ms > 0).then(|| chrono::Duration::milliseconds(self.max_fix_age_ms as i64))
    }
}

impl UploadConfig {
    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

impl CatalogConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs)
    }
}

impl DatabaseConfig {
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

impl ReplayConfig {
    pub fn default_delay(&self) -> Duration {
        Duration::from_millis(self.default_delay_ms)
    }
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with FT__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("FT").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        cfg.validate_for_binary()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds entirely from embedded defaults and overrides, without touching
    /// config files.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [tracking]
            min_accuracy_meters = 50.0
            min_distance_meters = 5.0
            recent_fix_buffer_size = 10
            geofence_boundary_buffer_meters = 10.0
            dwell_threshold_ms = 300000
            dwell_detection_enabled = true

            [upload]
            batch_size = 5
            max_queue_size = 1000

            [logging]
            level = "debug"
            format = "pretty"

            [metrics]
            prometheus_port = 0
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Validate the engine settings.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let tracking = &self.tracking;
        if tracking.min_accuracy_meters < 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "tracking.min_accuracy_meters must not be negative".to_string(),
            ));
        }
        if tracking.min_distance_meters < 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "tracking.min_distance_meters must not be negative".to_string(),
            ));
        }
        if tracking.geofence_boundary_buffer_meters < 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "tracking.geofence_boundary_buffer_meters must not be negative".to_string(),
            ));
        }
        if tracking.proximity_radius_meters < 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "tracking.proximity_radius_meters must not be negative".to_string(),
            ));
        }
        if tracking.recent_fix_buffer_size == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "tracking.recent_fix_buffer_size must be at least 1".to_string(),
            ));
        }
        if tracking.dwell_check_interval_secs == 0
            || self.upload.retry_interval_secs == 0
            || self.catalog.reload_interval_secs == 0
        {
            return Err(ConfigValidationError::InvalidValue(
                "job intervals must be at least 1 second".to_string(),
            ));
        }
        if self.upload.batch_size == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "upload.batch_size must be at least 1".to_string(),
            ));
        }
        if self.upload.max_queue_size < self.upload.batch_size {
            return Err(ConfigValidationError::InvalidValue(format!(
                "upload.max_queue_size ({}) must not be smaller than upload.batch_size ({})",
                self.upload.max_queue_size, self.upload.batch_size
            )));
        }
        Ok(())
    }

    /// Settings only the standalone binary needs.
    pub fn validate_for_binary(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "database.url (set FT__DATABASE__URL)".to_string(),
            ));
        }
        if self.replay.file.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "replay.file (set FT__REPLAY__FILE)".to_string(),
            ));
        }
        if self.replay.user_id.is_empty() || self.replay.farm_id.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "replay.user_id and replay.farm_id".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::load_for_test(&[]).unwrap();
        assert_eq!(config.tracking.min_accuracy_meters, 50.0);
        assert_eq!(config.tracking.min_distance_meters, 5.0);
        assert_eq!(config.tracking.recent_fix_buffer_size, 10);
        assert_eq!(config.tracking.fix_timeout_ms, 15_000);
        assert_eq!(config.tracking.max_fix_age_ms, 30_000);
        assert_eq!(config.upload.batch_size, 5);
        assert_eq!(config.upload.max_queue_size, 1000);
        assert_eq!(config.catalog.asset_page_size, 100);
        assert_eq!(config.metrics.prometheus_port, 0);
    }

    #[test]
    fn test_config_with_overrides() {
        let config = Config::load_for_test(&[
            ("upload.batch_size", "10"),
            ("tracking.min_distance_meters", "2.5"),
            ("logging.format", "json"),
        ])
        .unwrap();

        assert_eq!(config.upload.batch_size, 10);
        assert_eq!(config.tracking.min_distance_meters, 2.5);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_config_rejects_zero_batch_size() {
        let result = Config::load_for_test(&[("upload.batch_size", "0")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_rejects_queue_smaller_than_batch() {
        let result = Config::load_for_test(&[
            ("upload.batch_size", "20"),
            ("upload.max_queue_size", "10"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_rejects_negative_threshold() {
        let result = Config::load_for_test(&[("tracking.min_accuracy_meters", "-1")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_max_fix_age_zero_disables() {
        let mut config = Config::default();
        assert_eq!(
            config.tracking.max_fix_age(),
            Some(chrono::Duration::seconds(30))
        );
        config.tracking.max_fix_age_ms = 0;
        assert!(config.tracking.max_fix_age().is_none());
    }

    #[test]
    fn test_binary_validation_requires_database_and_replay() {
        let mut config = Config::default();
        assert!(matches!(
            config.validate_for_binary(),
            Err(ConfigValidationError::MissingRequired(_))
        ));

        config.database.url = "postgres://localhost/field".to_string();
        config.replay.file = "fixes.ndjson".to_string();
        config.replay.user_id = "u1".to_string();
        config.replay.farm_id = "farm-1".to_string();
        assert!(config.validate_for_binary().is_ok());
    }
}
