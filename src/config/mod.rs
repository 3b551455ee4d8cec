//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod etl;
mod storage;

use std::collections::HashSet;

pub use etl::{
    default_payment_methods, CalendarConfig, EtlConfig, PaymentMethodConfig, ScheduleConfig,
    DEFAULT_BATCH_SIZE, DEFAULT_INTERVAL_SECS, MAX_BATCH_SIZE,
};
pub use storage::DatabaseConfig;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "cinema-etl.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "CINEMA_ETL_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "CINEMA_ETL";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "CINEMA_ETL_LOG";

use serde::Deserialize;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("{0} database URL is empty")]
    EmptyUrl(&'static str),

    #[error("Duplicate payment method id {0}")]
    DuplicatePaymentId(i32),

    #[error("Duplicate payment method label {0:?}")]
    DuplicatePaymentLabel(String),

    #[error("Schedule interval must be greater than zero")]
    ZeroInterval,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Operational booking database (read-only).
    pub source: DatabaseConfig,
    /// Star-schema warehouse.
    pub warehouse: DatabaseConfig,
    /// Loader behaviour.
    pub etl: EtlConfig,
    /// Date dimension range.
    pub calendar: CalendarConfig,
    /// Scheduler binary settings.
    pub schedule: ScheduleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: DatabaseConfig::default_source(),
            warehouse: DatabaseConfig::default_warehouse(),
            etl: EtlConfig::default(),
            calendar: CalendarConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `cinema-etl.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the loaders cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl("source"));
        }
        if self.warehouse.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl("warehouse"));
        }
        if self.schedule.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        let mut ids = HashSet::new();
        let mut labels = HashSet::new();
        for method in &self.etl.payment_methods {
            if !ids.insert(method.id) {
                return Err(ConfigError::DuplicatePaymentId(method.id));
            }
            if !labels.insert(method.label.trim()) {
                return Err(ConfigError::DuplicatePaymentLabel(method.label.clone()));
            }
        }
        Ok(())
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        Self {
            source: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            warehouse: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.etl.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.schedule.interval_secs, 3600);
        assert!(config.schedule.run_on_start);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_for_test() {
        let config = Config::for_test();
        assert_eq!(config.source.url, "sqlite::memory:");
        assert_eq!(config.warehouse.max_connections, 1);
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let mut config = Config::default();
        config.warehouse.url = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyUrl("warehouse"))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_payment_codes() {
        let mut config = Config::default();
        config.etl.payment_methods.push(PaymentMethodConfig {
            id: 1,
            label: "Cash".to_string(),
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicatePaymentId(1))
        ));

        let mut config = Config::default();
        config.etl.payment_methods.push(PaymentMethodConfig {
            id: 9,
            label: " Thanh toán bằng tiền mặt ".to_string(),
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicatePaymentLabel(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.schedule.interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroInterval)));
    }
}
