//! Server configuration.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Listening endpoint and lot sizing.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Number of parking slots in the lot.
    pub capacity: usize,
    /// Listen backlog for pending connections.
    pub backlog: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            capacity: 10,
            backlog: 64,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name}={value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ServerConfig {
    /// Read overrides from the environment: `PORT` and `PARKLET_CAPACITY`.
    /// Unset variables keep the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(port) = parse_override("PORT", env::var("PORT").ok().as_deref())? {
            config.port = port;
        }
        if let Some(capacity) = parse_override(
            "PARKLET_CAPACITY",
            env::var("PARKLET_CAPACITY").ok().as_deref(),
        )? {
            config.capacity = capacity;
        }
        if config.capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "PARKLET_CAPACITY",
                value: "0".to_string(),
                reason: "capacity must be positive".to_string(),
            });
        }
        Ok(config)
    }
}

fn parse_override<T>(name: &'static str, raw: Option<&str>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                name,
                value: value.to_string(),
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.capacity, 10);
        assert_eq!(config.backlog, 64);
    }

    #[test]
    fn absent_override_keeps_default() {
        let port: Option<u16> = parse_override("PORT", None).unwrap();
        assert_eq!(port, None);
    }

    #[test]
    fn override_parses_with_whitespace() {
        let port: Option<u16> = parse_override("PORT", Some(" 6000 ")).unwrap();
        assert_eq!(port, Some(6000));
    }

    #[test]
    fn malformed_override_is_rejected() {
        let result: Result<Option<u16>, _> = parse_override("PORT", Some("cinco mil"));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
