//! Application configuration.
//!
//! Defaults, overridden by `POSTBOARD_*` environment variables, overridden in
//! turn by command line flags in the binary.

use crate::loader::UserFetchPolicy;
use crate::view::HeaderStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default API server
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value could not be parsed
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue {
        /// Offending field
        field: &'static str,
        /// Raw value
        value: String,
    },

    /// A value is not one of the accepted choices
    #[error("unknown {field} {value:?}")]
    UnknownVariant {
        /// Offending field
        field: &'static str,
        /// Raw value
        value: String,
    },

    /// The base URL is empty or not http(s)
    #[error("base URL must start with http:// or https://, got {0:?}")]
    InvalidBaseUrl(String),

    /// A value that must be positive is zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Runtime configuration of the postboard client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostboardConfig {
    /// API server, without trailing path
    pub base_url: String,
    /// Per-request timeout; no timeout when `None`
    pub request_timeout_secs: Option<u64>,
    /// Whether repeated user fetches hit the API
    pub user_fetch: UserFetchPolicy,
    /// How author headers obtain their user
    pub header: HeaderStrategy,
    /// Capacity of the failed-fetch queue
    pub failure_queue_size: usize,
    /// Default `tracing` level when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for PostboardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: None,
            user_fetch: UserFetchPolicy::default(),
            header: HeaderStrategy::default(),
            failure_queue_size: 100,
            log_level: "info".to_string(),
        }
    }
}

impl PostboardConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable holds an unparsable value
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable holds an unparsable value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("POSTBOARD_BASE_URL") {
            config.base_url = url.trim().to_string();
        }
        if let Some(secs) = lookup("POSTBOARD_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = Some(parse_number("request_timeout_secs", &secs)?);
        }
        if let Some(policy) = lookup("POSTBOARD_USER_FETCH") {
            config.user_fetch = policy.parse()?;
        }
        if let Some(strategy) = lookup("POSTBOARD_HEADER") {
            config.header = strategy.parse()?;
        }
        if let Some(size) = lookup("POSTBOARD_FAILURE_QUEUE_SIZE") {
            config.failure_queue_size = parse_number("failure_queue_size", &size)?;
        }
        if let Some(level) = lookup("POSTBOARD_LOG_LEVEL") {
            config.log_level = level.trim().to_ascii_lowercase();
        }

        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an empty or non-http(s) base URL (or one
    /// with surrounding whitespace), a zero timeout or queue size, or an
    /// unknown log level
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.as_str();
        let host = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://"));
        if url.trim() != url || host.is_none_or(|host| host.trim().is_empty()) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }

        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::Zero("request_timeout_secs"));
        }

        if self.failure_queue_size == 0 {
            return Err(ConfigError::Zero("failure_queue_size"));
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::UnknownVariant {
                field: "log_level",
                value: self.log_level.clone(),
            });
        }

        Ok(())
    }

    /// Request timeout as a [`Duration`]
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field,
        value: raw.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = PostboardConfig::default();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.user_fetch, UserFetchPolicy::Always);
        assert_eq!(config.header, HeaderStrategy::Pull);
        assert_eq!(config.request_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = PostboardConfig::from_lookup(lookup(&[
            ("POSTBOARD_BASE_URL", "http://localhost:3000"),
            ("POSTBOARD_REQUEST_TIMEOUT_SECS", "5"),
            ("POSTBOARD_USER_FETCH", "memoized"),
            ("POSTBOARD_HEADER", "fetch-on-mount"),
            ("POSTBOARD_FAILURE_QUEUE_SIZE", "10"),
            ("POSTBOARD_LOG_LEVEL", "DEBUG"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:3000");

        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.user_fetch, UserFetchPolicy::Memoized);
        assert_eq!(config.header, HeaderStrategy::FetchOnMount);
        assert_eq!(config.failure_queue_size, 10);
        assert_eq!(config.log_level, "debug");
        assert!(config.validate().is_ok());

        let padded = PostboardConfig::from_lookup(lookup(&[(
            "POSTBOARD_BASE_URL",
            "  https://example.com\n",
        )]))
        .unwrap();
        assert_eq!(padded.base_url, "https://example.com");
        assert!(padded.validate().is_ok());
    }

    #[test]
    fn test_unparsable_env_value() {
        let err = PostboardConfig::from_lookup(lookup(&[("POSTBOARD_REQUEST_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                field: "request_timeout_secs",
                value: "soon".to_string()
            }
        );

        let err = PostboardConfig::from_lookup(lookup(&[("POSTBOARD_HEADER", "push")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownVariant { field: "header", .. }));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad_url = PostboardConfig {
            base_url: "ftp://example.com".to_string(),
            ..PostboardConfig::default()
        };
        assert!(matches!(bad_url.validate(), Err(ConfigError::InvalidBaseUrl(_))));

        let padded = PostboardConfig {
            base_url: " https://example.com".to_string(),
            ..PostboardConfig::default()
        };
        assert!(matches!(padded.validate(), Err(ConfigError::InvalidBaseUrl(_))));

        let empty_host = PostboardConfig {
            base_url: "https://".to_string(),
            ..PostboardConfig::default()
        };
        assert!(empty_host.validate().is_err());

        let zero_timeout = PostboardConfig {
            request_timeout_secs: Some(0),
            ..PostboardConfig::default()
        };
        assert_eq!(zero_timeout.validate(), Err(ConfigError::Zero("request_timeout_secs")));

        let zero_queue = PostboardConfig {
            failure_queue_size: 0,
            ..PostboardConfig::default()
        };
        assert_eq!(zero_queue.validate(), Err(ConfigError::Zero("failure_queue_size")));

        let loud = PostboardConfig {
            log_level: "loud".to_string(),
            ..PostboardConfig::default()
        };
        assert!(loud.validate().is_err());
    }

    #[test]
    fn test_deserializes_partial_document() {
        let config: PostboardConfig =
            serde_json::from_str(r#"{"user_fetch": "memoized", "header": "fetch-on-mount"}"#).unwrap();

        assert_eq!(config.user_fetch, UserFetchPolicy::Memoized);
        assert_eq!(config.header, HeaderStrategy::FetchOnMount);
        assert_eq!(config.failure_queue_size, 100);
    }
}
