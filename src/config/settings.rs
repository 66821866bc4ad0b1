//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub admission: AdmissionConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the daily rolling log file; stdout only when absent
    pub directory: Option<String>,
    pub file_prefix: String,
    pub json: bool,
}

/// Admission engine tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdmissionConfig {
    /// Upper bound on waiting for an event's critical section
    pub lock_timeout_ms: u64,
    pub default_token_expiry_hours: u32,
    pub min_token_expiry_hours: u32,
    pub max_token_expiry_hours: u32,
    /// Base URL that check-in deep links are built on
    pub checkin_base_url: String,
}

impl AdmissionConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Clamp a requested token lifetime into the configured range
    ///
    /// The upper bound wins if the range is inverted.
    pub fn clamp_expiry_hours(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_token_expiry_hours)
            .max(self.min_token_expiry_hours)
            .min(self.max_token_expiry_hours)
    }
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("ADMISSION").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Load settings from an explicit file, layered over the defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::from(path.as_ref()))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::EngineError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/event_admission".to_string(),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_seconds: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: None,
                file_prefix: "event-admission.log".to_string(),
                json: false,
            },
            admission: AdmissionConfig::default(),
        }
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
            default_token_expiry_hours: 24,
            min_token_expiry_hours: 1,
            max_token_expiry_hours: 168,
            checkin_base_url: "https://events.example.com/checkin".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_expiry_hours() {
        let config = AdmissionConfig::default();
        assert_eq!(config.clamp_expiry_hours(None), 24);
        assert_eq!(config.clamp_expiry_hours(Some(0)), 1);
        assert_eq!(config.clamp_expiry_hours(Some(6)), 6);
        assert_eq!(config.clamp_expiry_hours(Some(1000)), 168);
    }

    #[test]
    fn test_clamp_expiry_hours_with_inverted_range() {
        let config = AdmissionConfig {
            min_token_expiry_hours: 48,
            max_token_expiry_hours: 12,
            ..AdmissionConfig::default()
        };
        assert_eq!(config.clamp_expiry_hours(Some(24)), 12);
        assert_eq!(config.clamp_expiry_hours(None), 12);
    }

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.admission.lock_timeout(), Duration::from_secs(5));
    }
}
