use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::store::BreakerSettings;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} missing, it is required")]
    Missing(&'static str),
    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("either DATABASE_URL or FLAGS_FILE must be set")]
    NoFlagSource,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub flags_file: Option<PathBuf>,
    pub sdk_key_hash: Option<String>,
    pub store_failure_threshold: u32,
    pub store_open_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv().is_ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse(
            "PORT",
            non_empty("PORT").ok_or(ConfigError::Missing("PORT"))?,
        )?;
        let host = non_empty("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let database_url = non_empty("DATABASE_URL");
        let flags_file = non_empty("FLAGS_FILE").map(PathBuf::from);
        if database_url.is_none() && flags_file.is_none() {
            return Err(ConfigError::NoFlagSource);
        }

        let store_failure_threshold = non_empty("STORE_FAILURE_THRESHOLD")
            .map(|v| parse("STORE_FAILURE_THRESHOLD", v))
            .transpose()?
            .unwrap_or(5);
        let store_open_seconds = non_empty("STORE_OPEN_SECONDS")
            .map(|v| parse("STORE_OPEN_SECONDS", v))
            .transpose()?
            .unwrap_or(30);

        Ok(Self {
            host,
            port,
            database_url,
            flags_file,
            sdk_key_hash: non_empty("SDK_KEY_HASH"),
            store_failure_threshold,
            store_open_seconds,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn breaker_settings(&self) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: self.store_failure_threshold.max(1),
            open_for: Duration::from_secs(self.store_open_seconds),
        }
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_minimal_config() {
        let config = config(&[("PORT", "8080"), ("DATABASE_URL", "postgres://localhost/flags")]).unwrap();

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.sdk_key_hash, None);
        assert_eq!(config.flags_file, None);
        assert_eq!(config.breaker_settings().failure_threshold, 5);
        assert_eq!(config.breaker_settings().open_for, Duration::from_secs(30));
    }

    #[test]
    fn test_full_config() {
        let config = config(&[
            ("PORT", "9000"),
            ("HOST", "0.0.0.0"),
            ("FLAGS_FILE", "flags.json"),
            ("SDK_KEY_HASH", "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"),
            ("STORE_FAILURE_THRESHOLD", "3"),
            ("STORE_OPEN_SECONDS", "10"),
        ])
        .unwrap();

        assert_eq!(config.addr(), "0.0.0.0:9000");
        assert_eq!(config.flags_file, Some(PathBuf::from("flags.json")));
        assert!(config.sdk_key_hash.is_some());
        assert_eq!(config.breaker_settings().failure_threshold, 3);
        assert_eq!(config.breaker_settings().open_for, Duration::from_secs(10));
    }

    #[test]
    fn test_missing_port() {
        let err = config(&[("DATABASE_URL", "postgres://localhost/flags")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("PORT"));
    }

    #[test]
    fn test_invalid_port() {
        let err = config(&[("PORT", "eighty"), ("FLAGS_FILE", "flags.json")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "PORT",
                value: "eighty".to_string()
            }
        );
    }

    #[test]
    fn test_requires_a_flag_source() {
        let err = config(&[("PORT", "8080"), ("DATABASE_URL", " ")]).unwrap_err();
        assert_eq!(err, ConfigError::NoFlagSource);
    }
}
