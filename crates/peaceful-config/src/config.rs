//! The root configuration type.

use serde::{Deserialize, Serialize};

use crate::{CacheConfig, ConfigError, CorsConfig, CsrfConfig, LogFormat, LoggingConfig, RateLimitConfig};

/// Complete dispatcher configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use peaceful_config::PeacefulConfig;
///
/// let config = PeacefulConfig::default();
/// assert_eq!(config.cache.ttl_secs, 60);
/// assert!(!config.cors.enabled);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PeacefulConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Response cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Rate limiting configuration.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,

    /// CSRF protection configuration.
    #[serde(default)]
    pub csrf: CsrfConfig,
}

impl PeacefulConfig {
    /// Development preset: pretty debug logs, permissive CORS.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                ansi_enabled: true,
                include_location: true,
                ..LoggingConfig::default()
            },
            cors: CorsConfig {
                enabled: true,
                allowed_origins: vec!["*".to_string()],
                ..CorsConfig::default()
            },
            ..Self::default()
        }
    }

    /// Production preset: JSON logs, rate limiting and CSRF enabled.
    #[must_use]
    pub fn production() -> Self {
        Self {
            rate_limit: RateLimitConfig {
                enabled: true,
                ..RateLimitConfig::default()
            },
            csrf: CsrfConfig {
                enabled: true,
                ..CsrfConfig::default()
            },
            ..Self::default()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - the cache TTL or entry bound is zero
    /// - the rate limit refill rate is not a positive number, or the burst is zero
    /// - CORS allows credentials together with any origin
    /// - a CORS method is not a valid HTTP method token
    /// - a CSRF name is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::invalid_value("cache.ttl_secs", "must be positive"));
        }
        if self.cache.max_entries == Some(0) {
            return Err(ConfigError::invalid_value(
                "cache.max_entries",
                "must be positive when set",
            ));
        }

        if !(self.rate_limit.per_second.is_finite() && self.rate_limit.per_second > 0.0) {
            return Err(ConfigError::invalid_value(
                "rate_limit.per_second",
                "must be a positive number",
            ));
        }
        if self.rate_limit.burst == 0 {
            return Err(ConfigError::invalid_value("rate_limit.burst", "must be positive"));
        }

        if self.cors.allow_credentials && self.cors.allows_any_origin() {
            return Err(ConfigError::invalid_value(
                "cors.allow_credentials",
                "cannot be combined with a wildcard origin",
            ));
        }
        if let Some(method) = self.cors.allowed_methods.iter().find(|m| !is_token(m)) {
            return Err(ConfigError::invalid_value(
                "cors.allowed_methods",
                format!("'{method}' is not a valid method"),
            ));
        }

        for (field, value) in [
            ("csrf.cookie_name", &self.csrf.cookie_name),
            ("csrf.header_name", &self.csrf.header_name),
            ("csrf.form_field", &self.csrf.form_field),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid_value(field, "must not be empty"));
            }
        }

        Ok(())
    }
}

/// An HTTP token: one or more visible ASCII characters without separators.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}
