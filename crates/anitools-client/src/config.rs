//! Backend connection configuration.
//!
//! Loaded from `ANITOOLS_*` environment variables, falling back to the
//! defaults in [`anitools_core::defaults`].
//!
//! | Variable | Default |
//! |----------|---------|
//! | `ANITOOLS_API_URL` | `http://127.0.0.1:8000` |
//! | `ANITOOLS_ACCESS_TOKEN` | unset |
//! | `ANITOOLS_TIMEOUT_SECS` | `30` |

use std::env;

use anitools_core::defaults;
use thiserror::Error;
use tracing::debug;

pub const ENV_API_URL: &str = "ANITOOLS_API_URL";
pub const ENV_ACCESS_TOKEN: &str = "ANITOOLS_ACCESS_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "ANITOOLS_TIMEOUT_SECS";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for anitools_core::Error {
    fn from(e: ConfigError) -> Self {
        anitools_core::Error::Config(e.to_string())
    }
}

/// Where and how to reach the anitools backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// Sent as `Authorization: Bearer <token>` when present.
    pub access_token: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::API_URL.to_string(),
            access_token: None,
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Load from environment variables. Unparseable numbers fall back to
    /// their defaults; empty tokens count as unset.
    pub fn from_env() -> Self {
        let base_url = env::var(ENV_API_URL).unwrap_or_else(|_| defaults::API_URL.to_string());
        let access_token = env::var(ENV_ACCESS_TOKEN)
            .ok()
            .filter(|t| !t.trim().is_empty());
        let timeout_secs = env::var(ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::REQUEST_TIMEOUT_SECS);

        debug!(
            base_url = %base_url,
            has_token = access_token.is_some(),
            timeout_secs,
            "Loaded backend config from environment"
        );

        Self {
            base_url,
            access_token,
            timeout_secs,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Validation(
                "base_url cannot be empty".to_string(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: ENV_TIMEOUT_SECS,
                value: "0".to_string(),
            });
        }

        Ok(())
    }

    /// `base_url` joined with `endpoint`.
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BackendConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8000");
        assert!(config.access_token.is_none());
        assert_eq!(config.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let err = BackendConfig::new("ftp://example.org").validate().unwrap_err();
        assert!(err.to_string().contains("http://"));

        assert!(BackendConfig::new("").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = BackendConfig::default().with_timeout_secs(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { var: ENV_TIMEOUT_SECS, .. })
        ));
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let config = BackendConfig::new("https://api.example.org/");
        assert_eq!(config.url("/filterValues"), "https://api.example.org/filterValues");
    }

    #[test]
    fn test_config_error_converts_to_core_error() {
        let err: anitools_core::Error = ConfigError::Validation("nope".to_string()).into();
        assert!(matches!(err, anitools_core::Error::Config(_)));
    }
}
