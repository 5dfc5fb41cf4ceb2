use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Weather provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Location settings (fallback coordinate, optional fixed position)
    #[serde(default)]
    pub location: LocationConfig,

    /// Refresh cadence settings
    #[serde(default)]
    pub refresh: RefreshConfig,
}

/// Weather provider configuration.
///
/// Credentials are optional here: their absence surfaces as a
/// `CredentialsMissing` failure at fetch time, not at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Basic-auth username (can also be set via METEOMATICS_USERNAME)
    pub username: Option<String>,

    /// Basic-auth password (can also be set via METEOMATICS_PASSWORD)
    pub password: Option<String>,

    /// Provider API base URL
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
}

fn default_provider_base_url() -> String {
    "https://api.meteomatics.com".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            username: std::env::var("METEOMATICS_USERNAME").ok(),
            password: std::env::var("METEOMATICS_PASSWORD").ok(),
            base_url: default_provider_base_url(),
        }
    }
}

impl ProviderConfig {
    /// Resolved credential pair, environment taking precedence over file.
    pub fn credentials(&self) -> Option<(String, String)> {
        let username = std::env::var("METEOMATICS_USERNAME")
            .ok()
            .or_else(|| self.username.clone())?;
        let password = std::env::var("METEOMATICS_PASSWORD")
            .ok()
            .or_else(|| self.password.clone())?;
        Some((username, password))
    }
}

/// Location configuration.
///
/// Every field carries a default so a hand-edited partial `[location]`
/// table still parses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Fallback latitude used when no device position is available
    #[serde(default = "default_fallback_latitude")]
    pub fallback_latitude: f64,

    /// Fallback longitude used when no device position is available
    #[serde(default = "default_fallback_longitude")]
    pub fallback_longitude: f64,

    /// Optional fixed position for headless deployments without a
    /// location service (latitude)
    pub fixed_latitude: Option<f64>,

    /// Optional fixed position (longitude)
    pub fixed_longitude: Option<f64>,
}

// Dublin city centre
fn default_fallback_latitude() -> f64 {
    53.3501
}

fn default_fallback_longitude() -> f64 {
    -6.2661
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            fallback_latitude: default_fallback_latitude(),
            fallback_longitude: default_fallback_longitude(),
            fixed_latitude: None,
            fixed_longitude: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Poll interval in minutes while the app is foregrounded
    #[serde(default = "default_poll_minutes")]
    pub poll_minutes: u32,
}

fn default_poll_minutes() -> u32 {
    5
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            poll_minutes: default_poll_minutes(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stormwarn")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            provider: ProviderConfig::default(),
            location: LocationConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, writing the default
    /// file on first run.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        if !validation.warnings.is_empty() {
            for warning in &validation.warnings {
                tracing::warn!("Config warning: {}", warning);
            }
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if Url::parse(&self.provider.base_url).is_err() {
            result.add_error("provider.base_url", "not a valid URL");
        }

        Self::validate_coordinate(
            &mut result,
            "location.fallback",
            self.location.fallback_latitude,
            self.location.fallback_longitude,
        );

        if let (Some(lat), Some(lon)) =
            (self.location.fixed_latitude, self.location.fixed_longitude)
        {
            Self::validate_coordinate(&mut result, "location.fixed", lat, lon);
        } else if self.location.fixed_latitude.is_some() || self.location.fixed_longitude.is_some()
        {
            result.add_error(
                "location.fixed",
                "fixed_latitude and fixed_longitude must be set together",
            );
        }

        if self.refresh.poll_minutes == 0 {
            result.add_error("refresh.poll_minutes", "must be at least 1");
        }

        if self.provider.credentials().is_none() {
            result.add_warning(
                "provider",
                "no credentials configured; forecast fetches will fail until set",
            );
        }

        result
    }

    fn validate_coordinate(result: &mut ValidationResult, field: &str, lat: f64, lon: f64) {
        if !(-90.0..=90.0).contains(&lat) {
            result.add_error(field, format!("latitude {} outside -90..90", lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            result.add_error(field, format!("longitude {} outside -180..180", lon));
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path, creating parent
    /// directories as needed.
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("stormwarn");
        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "{}", result.error_summary());
    }

    #[test]
    fn default_fallback_is_dublin() {
        let config = Config::default();
        assert!((config.location.fallback_latitude - 53.3501).abs() < 1e-9);
        assert!((config.location.fallback_longitude + 6.2661).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_fallback_is_rejected() {
        let mut config = Config::default();
        config.location.fallback_latitude = 123.0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.error_summary().contains("latitude"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut config = Config::default();
        config.refresh.poll_minutes = 0;
        let result = config.validate();
        assert!(!result.is_valid());
    }

    #[test]
    fn half_fixed_position_is_rejected() {
        let mut config = Config::default();
        config.location.fixed_latitude = Some(48.0);
        config.location.fixed_longitude = None;
        let result = config.validate();
        assert!(!result.is_valid());
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let mut config = Config::default();
        config.provider.base_url = "not a url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
    }

    #[test]
    fn first_run_writes_default_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert!((config.location.fallback_latitude - 53.3501).abs() < 1e-9);
        assert_eq!(config.refresh.poll_minutes, 5);
    }

    #[test]
    fn save_then_load_round_trips_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.refresh.poll_minutes = 15;
        config.location.fixed_latitude = Some(48.8566);
        config.location.fixed_longitude = Some(2.3522);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.refresh.poll_minutes, 15);
        assert_eq!(loaded.location.fixed_latitude, Some(48.8566));
        assert_eq!(loaded.location.fixed_longitude, Some(2.3522));
    }

    #[test]
    fn partial_location_table_fills_defaults() {
        let text = "[location]\nfixed_latitude = 48.0\nfixed_longitude = 2.0\n";
        let config: Config = toml::from_str(text).unwrap();
        assert!((config.location.fallback_latitude - 53.3501).abs() < 1e-9);
        assert!((config.location.fallback_longitude + 6.2661).abs() < 1e-9);
        assert_eq!(config.location.fixed_latitude, Some(48.0));
    }

    #[test]
    fn empty_file_parses_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.refresh.poll_minutes, 5);
        assert!(config.config_dir.ends_with("stormwarn"));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.refresh.poll_minutes, config.refresh.poll_minutes);
        assert_eq!(parsed.provider.base_url, config.provider.base_url);
    }
}
