//! Configuration sections.
//!
//! Every section rejects unknown fields and falls back to its defaults for
//! missing ones, so a file only needs to mention what it changes.

use serde::{Deserialize, Serialize};

use peaceful_telemetry::logging::LogConfig;

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Install the tracing subscriber.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Add the per-request access log stage to the global chain. Independent
    /// of `enabled`.
    #[serde(default = "default_true")]
    pub access_log: bool,

    /// Filter directive, e.g. `info` or `peaceful=debug,info`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            access_log: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Converts this section into the telemetry crate's logging settings.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        let base = match self.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            file_line_info: self.include_location,
            ansi: self.ansi_enabled,
            ..base
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Response cache configuration.
///
/// The dispatcher does not install the cache globally; applications read
/// this section when attaching caching to routes or groups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Enable response caching.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time-to-live of cached responses, in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Upper bound on cached entries. Unbounded when absent.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl_secs(),
            max_entries: None,
        }
    }
}

const fn default_ttl_secs() -> u64 {
    60
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    #[serde(default)]
    pub enabled: bool,

    /// Tokens added to each client bucket per second.
    #[serde(default = "default_per_second")]
    pub per_second: f64,

    /// Bucket capacity.
    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            per_second: default_per_second(),
            burst: default_burst(),
        }
    }
}

const fn default_per_second() -> f64 {
    1.0
}

const fn default_burst() -> u32 {
    5
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Enable CORS handling.
    #[serde(default)]
    pub enabled: bool,

    /// Accepted origins; `"*"` accepts any.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Accepted methods.
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,

    /// Accepted request headers.
    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,

    /// Response headers scripts may read.
    #[serde(default)]
    pub expose_headers: Vec<String>,

    /// Allow cookies and authorization headers.
    #[serde(default)]
    pub allow_credentials: bool,

    /// Preflight cache lifetime in seconds.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: Vec::new(),
            allowed_methods: default_cors_methods(),
            allowed_headers: default_cors_headers(),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl CorsConfig {
    /// Returns true if any origin is accepted.
    #[must_use]
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn default_cors_methods() -> Vec<String> {
    ["GET", "HEAD", "POST", "PUT", "DELETE", "PATCH"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_cors_headers() -> Vec<String> {
    ["content-type", "authorization", "x-request-id", "x-csrf-token"]
        .into_iter()
        .map(String::from)
        .collect()
}

const fn default_max_age_secs() -> u64 {
    86_400
}

/// CSRF protection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CsrfConfig {
    /// Enable CSRF protection.
    #[serde(default)]
    pub enabled: bool,

    /// Cookie carrying the expected token.
    #[serde(default = "default_csrf_name")]
    pub cookie_name: String,

    /// Header carrying the submitted token.
    #[serde(default = "default_csrf_header")]
    pub header_name: String,

    /// Form field carrying the submitted token.
    #[serde(default = "default_csrf_name")]
    pub form_field: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cookie_name: default_csrf_name(),
            header_name: default_csrf_header(),
            form_field: default_csrf_name(),
        }
    }
}

fn default_csrf_name() -> String {
    "csrf_token".to_string()
}

fn default_csrf_header() -> String {
    "X-CSRF-Token".to_string()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_to_log_config() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            include_location: true,
            ..Default::default()
        };
        let log = logging.to_log_config();
        assert_eq!(log.level, "debug");
        assert!(!log.json_format);
        assert!(log.file_line_info);
        assert!(!log.ansi);
    }

    #[test]
    fn test_access_log_is_independent() {
        let logging: LoggingConfig = toml::from_str("enabled = false").unwrap();
        assert!(!logging.enabled);
        assert!(logging.access_log);
        assert!(!logging.to_log_config().enabled);
    }

    #[test]
    fn test_section_defaults() {
        let cache = CacheConfig::default();
        assert!(cache.enabled);
        assert_eq!(cache.ttl_secs, 60);
        assert_eq!(cache.max_entries, None);

        let limit = RateLimitConfig::default();
        assert!(!limit.enabled);
        assert_eq!(limit.burst, 5);

        let csrf = CsrfConfig::default();
        assert_eq!(csrf.cookie_name, "csrf_token");
        assert_eq!(csrf.form_field, "csrf_token");
    }

    #[test]
    fn test_cors_wildcard() {
        let cors = CorsConfig {
            allowed_origins: vec!["*".to_string()],
            ..Default::default()
        };
        assert!(cors.allows_any_origin());
        assert!(!CorsConfig::default().allows_any_origin());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<CacheConfig, _> = toml::from_str("ttl = 5");
        assert!(result.is_err());
    }
}
