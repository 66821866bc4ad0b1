//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{EngineError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_logging_config(&settings.logging)?;
    validate_admission_config(&settings.admission)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(EngineError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(EngineError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(EngineError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(EngineError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(EngineError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    if config.directory.is_some() && config.file_prefix.is_empty() {
        return Err(EngineError::Config(
            "Log file prefix is required when a log directory is set".to_string()
        ));
    }

    Ok(())
}

/// Validate admission engine configuration
pub fn validate_admission_config(config: &super::AdmissionConfig) -> Result<()> {
    if config.lock_timeout_ms == 0 {
        return Err(EngineError::Config(
            "Lock timeout must be greater than 0".to_string()
        ));
    }

    if config.min_token_expiry_hours == 0 {
        return Err(EngineError::Config(
            "Minimum token expiry must be at least one hour".to_string()
        ));
    }

    if config.min_token_expiry_hours > config.max_token_expiry_hours {
        return Err(EngineError::Config(
            "Minimum token expiry cannot exceed maximum token expiry".to_string()
        ));
    }

    if !(config.min_token_expiry_hours..=config.max_token_expiry_hours)
        .contains(&config.default_token_expiry_hours)
    {
        return Err(EngineError::Config(
            format!(
                "Default token expiry {}h must be within {}..={}h",
                config.default_token_expiry_hours,
                config.min_token_expiry_hours,
                config.max_token_expiry_hours
            )
        ));
    }

    url::Url::parse(&config.checkin_base_url)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut settings = Settings::default();
        settings.logging.level = "verbose".to_string();
        assert_matches!(validate_settings(&settings), Err(EngineError::Config(_)));
    }

    #[test]
    fn test_rejects_inverted_expiry_range() {
        let mut settings = Settings::default();
        settings.admission.min_token_expiry_hours = 48;
        settings.admission.max_token_expiry_hours = 12;
        assert_matches!(validate_settings(&settings), Err(EngineError::Config(_)));
    }

    #[test]
    fn test_rejects_default_expiry_outside_range() {
        let mut settings = Settings::default();
        settings.admission.default_token_expiry_hours = 500;
        assert_matches!(validate_settings(&settings), Err(EngineError::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_base_url() {
        let mut settings = Settings::default();
        settings.admission.checkin_base_url = "not a url".to_string();
        assert_matches!(validate_settings(&settings), Err(EngineError::UrlParse(_)));
    }
}
