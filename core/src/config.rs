//! Client configuration.
//!
//! Defaults point at a locally running `mock-server`. `from_env` overrides
//! individual settings from `WASTE_*` environment variables.

use std::time::Duration;

use crate::error::ConfigError;
use crate::types::Coordinates;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_TOKEN_KEY: &str = "authToken";

/// Stand-in location used when a report arrives without coordinates.
/// Device geolocation is expected to replace this; keep it configurable.
pub const DEFAULT_FALLBACK_COORDINATES: Coordinates = Coordinates {
    lat: 28.6139,
    lng: 77.2090,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base endpoint, e.g. `https://example.org/api`. Operation paths are
    /// appended to it.
    pub base_url: String,
    /// Hard ceiling on the analysis request.
    pub analysis_timeout: Duration,
    /// Coordinates substituted into reports submitted without any.
    pub fallback_coordinates: Coordinates,
    /// Slot name of the persisted bearer token.
    pub token_key: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            analysis_timeout: DEFAULT_ANALYSIS_TIMEOUT,
            fallback_coordinates: DEFAULT_FALLBACK_COORDINATES,
            token_key: DEFAULT_TOKEN_KEY.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source. Unset variables keep
    /// their defaults; set but unparsable ones are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup("WASTE_API_URL") {
            config.base_url = url;
        }
        if let Some(secs) = lookup("WASTE_ANALYSIS_TIMEOUT_SECS") {
            config.analysis_timeout = Duration::from_secs(parse_var("WASTE_ANALYSIS_TIMEOUT_SECS", &secs)?);
        }
        if let Some(lat) = lookup("WASTE_FALLBACK_LAT") {
            config.fallback_coordinates.lat = parse_var("WASTE_FALLBACK_LAT", &lat)?;
        }
        if let Some(lng) = lookup("WASTE_FALLBACK_LNG") {
            config.fallback_coordinates.lng = parse_var("WASTE_FALLBACK_LNG", &lng)?;
        }
        if let Some(key) = lookup("WASTE_TOKEN_KEY") {
            config.token_key = key;
        }
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name: name.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_keeps_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.analysis_timeout, Duration::from_secs(20));
    }

    #[test]
    fn overrides_are_applied() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("WASTE_API_URL", "https://waste.example.org/api"),
            ("WASTE_ANALYSIS_TIMEOUT_SECS", "5"),
            ("WASTE_FALLBACK_LAT", "12.5"),
            ("WASTE_FALLBACK_LNG", "-3.25"),
            ("WASTE_TOKEN_KEY", "session"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://waste.example.org/api");
        assert_eq!(config.analysis_timeout, Duration::from_secs(5));
        assert_eq!(config.fallback_coordinates, Coordinates::new(12.5, -3.25));
        assert_eq!(config.token_key, "session");
    }

    #[test]
    fn invalid_number_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[("WASTE_FALLBACK_LAT", "north")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref name, ref value } if name == "WASTE_FALLBACK_LAT" && value == "north"
        ));
    }

    #[test]
    fn invalid_timeout_is_a_config_error() {
        let err = ClientConfig::from_lookup(lookup(&[("WASTE_ANALYSIS_TIMEOUT_SECS", "-1")])).unwrap_err();
        assert_eq!(err.to_string(), "WASTE_ANALYSIS_TIMEOUT_SECS has invalid value \"-1\"");
    }
}
