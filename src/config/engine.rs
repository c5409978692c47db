//! Engine settings loading from config.toml
//!
//! The `[engine]` table controls how far ahead instances are materialized and how
//! wide the nearby-payment window is. Every field has a default, so an empty or
//! missing file yields a working configuration.

use crate::{
    core::payment::DEFAULT_NEARBY_WINDOW_DAYS,
    errors::{Error, Result},
};
use chrono::{Months, NaiveDate};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_HORIZON_MONTHS: u32 = 12;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Scheduling engine settings
    #[serde(default)]
    pub engine: EngineSettings,
}

/// Settings for instance generation and payment matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// How many calendar months past today instances are generated
    pub horizon_months: u32,
    /// Half-width in days of the window used by the nearby-transaction check
    pub nearby_window_days: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            horizon_months: DEFAULT_HORIZON_MONTHS,
            nearby_window_days: DEFAULT_NEARBY_WINDOW_DAYS,
        }
    }
}

impl EngineSettings {
    /// Last calendar day that may carry an instance when today is `today`.
    ///
    /// Saturates at `NaiveDate::MAX` instead of failing for absurd settings.
    #[must_use]
    pub fn horizon_from(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_months(Months::new(self.horizon_months))
            .unwrap_or(NaiveDate::MAX)
    }

    fn validate(&self) -> Result<()> {
        if self.horizon_months == 0 {
            return Err(Error::Config {
                message: "engine.horizon_months must be at least 1".to_string(),
            });
        }
        if self.nearby_window_days < 0 {
            return Err(Error::Config {
                message: "engine.nearby_window_days cannot be negative".to_string(),
            });
        }
        Ok(())
    }
}

/// Parses and validates configuration from a TOML string.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.engine.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A setting is out of range
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;
    parse_config(&contents)
}

/// Loads configuration from the default location (./config.toml), falling back to
/// defaults when the file does not exist.
pub fn load_default_config() -> Result<AppConfig> {
    let path = Path::new("config.toml");
    if !path.exists() {
        tracing::info!("No config.toml found, using default engine settings");
        return Ok(AppConfig::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_engine_settings() {
        let toml_str = r"
            [engine]
            horizon_months = 6
            nearby_window_days = 3
        ";

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.engine.horizon_months, 6);
        assert_eq!(config.engine.nearby_window_days, 3);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.engine, EngineSettings::default());

        let config = parse_config("[engine]\nhorizon_months = 24\n").unwrap();
        assert_eq!(config.engine.horizon_months, 24);
        assert_eq!(config.engine.nearby_window_days, DEFAULT_NEARBY_WINDOW_DAYS);
    }

    #[test]
    fn test_rejects_out_of_range_settings() {
        assert!(matches!(
            parse_config("[engine]\nhorizon_months = 0\n"),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            parse_config("[engine]\nnearby_window_days = -1\n"),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_toml() {
        assert!(matches!(
            parse_config("[engine\nhorizon_months = 6"),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_horizon_from_today() {
        let settings = EngineSettings::default();
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(
            settings.horizon_from(today),
            NaiveDate::from_ymd_opt(2027, 10, 16).unwrap()
        );
    }
}
