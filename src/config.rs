use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

use crate::settings::Theme;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OPENWEATHER_API_KEY not set; weather requests will fail")]
    MissingApiKey,
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub openweather_api_key: Option<String>,
    pub openweather_base_url: String,
    pub openweather_geo_base_url: String,
    pub database_url: String,
    pub bind_addr: String,
    /// Stand-in for the OS colour-scheme preference.
    pub system_theme: Theme,
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::from_lookup(|name| env::var(name).ok())?)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let system_theme = match lookup("SYSTEM_THEME") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "SYSTEM_THEME",
                value,
            })?,
            None => Theme::Dark,
        };

        let http_timeout_secs = match lookup("HTTP_TIMEOUT_SECS") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "HTTP_TIMEOUT_SECS",
                value,
            })?,
            None => 30,
        };

        Ok(Config {
            openweather_api_key: lookup("OPENWEATHER_API_KEY").filter(|k| !k.trim().is_empty()),
            openweather_base_url: lookup("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|| "https://api.openweathermap.org/data/2.5".to_string()),
            openweather_geo_base_url: lookup("OPENWEATHER_GEO_BASE_URL")
                .unwrap_or_else(|| "https://api.openweathermap.org/geo/1.0".to_string()),
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:./weather_dashboard.db?mode=rwc".to_string()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            system_theme,
            http_timeout_secs,
        })
    }

    /// Startup problems that are worth reporting but not fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.openweather_api_key.is_none() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn for_base_url(base_url: &str, api_key: Option<&str>) -> Self {
        Config {
            openweather_api_key: api_key.map(str::to_string),
            openweather_base_url: base_url.to_string(),
            openweather_geo_base_url: base_url.to_string(),
            database_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            system_theme: Theme::Dark,
            http_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.openweather_base_url, "https://api.openweathermap.org/data/2.5");
        assert_eq!(config.openweather_geo_base_url, "https://api.openweathermap.org/geo/1.0");
        assert_eq!(config.system_theme, Theme::Dark);
        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.validate(), Err(ConfigError::MissingApiKey));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENWEATHER_API_KEY", "abc"),
            ("SYSTEM_THEME", "light"),
            ("BIND_ADDR", "127.0.0.1:9000"),
        ]))
        .unwrap();

        assert_eq!(config.openweather_api_key.as_deref(), Some("abc"));
        assert_eq!(config.system_theme, Theme::Light);
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = Config::from_lookup(lookup_from(&[("OPENWEATHER_API_KEY", "  ")])).unwrap();
        assert_eq!(config.validate(), Err(ConfigError::MissingApiKey));
    }

    #[test]
    fn test_invalid_theme() {
        let err = Config::from_lookup(lookup_from(&[("SYSTEM_THEME", "sepia")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "SYSTEM_THEME", .. }));
    }
}
