//! Runtime configuration
//!
//! Read from environment variables; every value has a default so the
//! dashboard starts with no configuration at all.
//!
//! | Variable               | Default   |
//! |------------------------|-----------|
//! | `PORT`                 | `8080`    |
//! | `DASHBOARD_HOST`       | `0.0.0.0` |
//! | `DASHBOARD_DATA_DIR`   | `data`    |
//! | `DASHBOARD_BACKEND`    | `file`    |
//! | `DASHBOARD_MAX_VISITS` | per backend (500 file, 100 sqlite) |
//! | `DASHBOARD_LOG`        | `info` (`RUST_LOG` wins when set) |

use std::path::PathBuf;

use thiserror::Error;

use crate::store::{Backend, StoreConfig};

pub const ENV_PREFIX: &str = "DASHBOARD_";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Source of configuration values
pub trait EnvSource {
    /// Look up a variable by its full name
    fn get_raw(&self, key: &str) -> Option<String>;

    /// Look up `DASHBOARD_<key>`
    fn get(&self, key: &str) -> Option<String> {
        self.get_raw(&format!("{}{}", ENV_PREFIX, key))
    }
}

/// Reads the process environment
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get_raw(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<F> EnvSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get_raw(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Server and store configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
    pub store: StoreConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source<E: EnvSource>(env: &E) -> Result<Self, ConfigError> {
        let port = match non_empty(env.get_raw("PORT")) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid("PORT", &raw, e.to_string()))?,
            None => DEFAULT_PORT,
        };

        let host = non_empty(env.get("HOST")).unwrap_or_else(|| DEFAULT_HOST.to_string());

        let data_dir = non_empty(env.get("DATA_DIR"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let backend = match non_empty(env.get("BACKEND")) {
            Some(raw) => raw
                .parse::<Backend>()
                .map_err(|reason| ConfigError::invalid("DASHBOARD_BACKEND", &raw, reason))?,
            None => Backend::File,
        };

        let mut store = StoreConfig::new(backend, data_dir);
        if let Some(raw) = non_empty(env.get("MAX_VISITS")) {
            let max_visits = raw
                .parse::<usize>()
                .map_err(|e| ConfigError::invalid("DASHBOARD_MAX_VISITS", &raw, e.to_string()))?;
            if max_visits == 0 {
                return Err(ConfigError::invalid(
                    "DASHBOARD_MAX_VISITS",
                    &raw,
                    "must be at least 1",
                ));
            }
            store = store.with_max_visits(max_visits);
        }

        let log_filter = non_empty(env.get_raw("RUST_LOG"))
            .or_else(|| non_empty(env.get("LOG")))
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            host,
            port,
            log_filter,
            store,
        })
    }

    /// `host:port` to bind the HTTP listener to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_source(&env_of(&[])).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.store.backend, Backend::File);
        assert_eq!(config.store.max_visits, 500);
        assert_eq!(config.store.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_sqlite_backend_default_cap() {
        let config = Config::from_source(&env_of(&[("DASHBOARD_BACKEND", "sqlite")])).unwrap();
        assert_eq!(config.store.backend, Backend::Sqlite);
        assert_eq!(config.store.max_visits, 100);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_source(&env_of(&[
            ("PORT", "9000"),
            ("DASHBOARD_HOST", "127.0.0.1"),
            ("DASHBOARD_DATA_DIR", "/srv/dash"),
            ("DASHBOARD_MAX_VISITS", "42"),
            ("DASHBOARD_LOG", "visit_log=debug"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.store.data_dir, PathBuf::from("/srv/dash"));
        assert_eq!(config.store.max_visits, 42);
        assert_eq!(config.log_filter, "visit_log=debug");
    }

    #[test]
    fn test_rust_log_takes_precedence() {
        let config = Config::from_source(&env_of(&[
            ("RUST_LOG", "warn"),
            ("DASHBOARD_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = Config::from_source(&env_of(&[("PORT", "  "), ("DASHBOARD_BACKEND", "")])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.store.backend, Backend::File);
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::from_source(&env_of(&[("PORT", "http")])).is_err());
        assert!(Config::from_source(&env_of(&[("DASHBOARD_BACKEND", "redis")])).is_err());
        assert!(Config::from_source(&env_of(&[("DASHBOARD_MAX_VISITS", "0")])).is_err());
        assert!(Config::from_source(&env_of(&[("DASHBOARD_MAX_VISITS", "-3")])).is_err());
    }
}
