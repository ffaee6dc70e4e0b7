use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse Error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation Error: {0}")]
    Validation(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub general: GeneralConfig,
    pub location: LocationConfig,
    pub weather: WeatherConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeneralConfig {
    pub log_level: String,
    /// Theme used when no stored preference exists: "light" or "dark".
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_theme() -> String {
    "light".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LocationConfig {
    /// "ip", "manual", or "off"
    pub method: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WeatherConfig {
    /// "wttr" or "mock"
    pub method: String,
    #[serde(default = "default_refresh_minutes")]
    pub refresh_minutes: u64,
}

fn default_refresh_minutes() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig {
                log_level: "info".to_string(),
                theme: "light".to_string(),
            },
            location: LocationConfig {
                method: "ip".to_string(),
                latitude: None,
                longitude: None,
            },
            weather: WeatherConfig {
                method: "wttr".to_string(),
                refresh_minutes: 30,
            },
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weather.refresh_minutes < 5 {
            return Err(ConfigError::Validation(
                "weather refresh interval below 5 minutes".to_string(),
            ));
        }
        if !matches!(self.general.theme.as_str(), "light" | "dark") {
            return Err(ConfigError::Validation(format!(
                "unknown theme '{}'",
                self.general.theme
            )));
        }
        if self.location.method == "manual"
            && (self.location.latitude.is_none() || self.location.longitude.is_none())
        {
            return Err(ConfigError::Validation(
                "manual location requires latitude and longitude".to_string(),
            ));
        }
        Ok(())
    }
}
