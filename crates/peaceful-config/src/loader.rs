//! Layered configuration loading.
//!
//! Layers apply in order, later ones overriding earlier ones:
//! 1. Defaults (or a preset)
//! 2. A configuration file (TOML or JSON)
//! 3. Environment variables named `PREFIX__SECTION__KEY`

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::{ConfigError, LogFormat, PeacefulConfig};

/// Configuration loader.
///
/// # Example
///
/// ```no_run
/// use peaceful_config::ConfigLoader;
///
/// # fn main() -> Result<(), peaceful_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_optional_file("peaceful.toml")?
///     .with_env_prefix("PEACEFUL")
///     .load()?;
/// # let _ = config;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: PeacefulConfig,
    env_prefix: Option<String>,
    env_vars: Option<HashMap<String, String>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PeacefulConfig::default(),
            env_prefix: None,
            env_vars: None,
        }
    }

    /// Resets to default values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = PeacefulConfig::default();
        self
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = PeacefulConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = PeacefulConfig::production();
        self
    }

    /// Loads a `.toml` or `.json` file.
    ///
    /// Sections missing from the file take their default values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or unreadable, has an
    /// unsupported extension, or does not parse (unknown fields included).
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        self.config = match extension.as_deref() {
            Some("toml") => toml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration file format: {}",
                    path.display()
                )))
            }
        };
        Ok(self)
    }

    /// Loads a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in the given format (`toml` or `json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use peaceful_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [cache]
    ///     ttl_secs = 5
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.cache.ttl_secs, 5);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Reads overrides from process environment variables with this prefix.
    ///
    /// With prefix `PEACEFUL`, `PEACEFUL__CACHE__TTL_SECS=30` sets
    /// `cache.ttl_secs`. List values are comma separated.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Uses `vars` instead of the process environment for overrides.
    #[must_use]
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Applies environment overrides, validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse or validation fails.
    pub fn load(mut self) -> Result<PeacefulConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars = self
                .env_vars
                .take()
                .unwrap_or_else(|| env::vars().collect());
            let mut keys: Vec<_> = vars.keys().filter(|k| k.starts_with(&prefix)).collect();
            keys.sort();
            for key in keys {
                self.apply_env_var(key, &vars[key], &prefix)?;
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without env overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> PeacefulConfig {
        self.config
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(rest) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            return Ok(());
        };
        let parts: Vec<&str> = rest.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["LOGGING", "ENABLED"] => config.logging.enabled = parse_bool(key, value)?,
            ["LOGGING", "ACCESS_LOG"] => config.logging.access_log = parse_bool(key, value)?,
            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => return Err(ConfigError::env_parse_error(key, "expected 'json' or 'pretty'")),
                };
            }
            ["LOGGING", "ANSI_ENABLED"] => config.logging.ansi_enabled = parse_bool(key, value)?,
            ["LOGGING", "INCLUDE_LOCATION"] => {
                config.logging.include_location = parse_bool(key, value)?;
            }

            ["CACHE", "ENABLED"] => config.cache.enabled = parse_bool(key, value)?,
            ["CACHE", "TTL_SECS"] => config.cache.ttl_secs = parse_num(key, value)?,
            ["CACHE", "MAX_ENTRIES"] => {
                config.cache.max_entries = if value.is_empty() || value.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(parse_num(key, value)?)
                };
            }

            ["RATE_LIMIT", "ENABLED"] => config.rate_limit.enabled = parse_bool(key, value)?,
            ["RATE_LIMIT", "PER_SECOND"] => config.rate_limit.per_second = parse_num(key, value)?,
            ["RATE_LIMIT", "BURST"] => config.rate_limit.burst = parse_num(key, value)?,

            ["CORS", "ENABLED"] => config.cors.enabled = parse_bool(key, value)?,
            ["CORS", "ALLOWED_ORIGINS"] => config.cors.allowed_origins = parse_list(value),
            ["CORS", "ALLOWED_METHODS"] => config.cors.allowed_methods = parse_list(value),
            ["CORS", "ALLOWED_HEADERS"] => config.cors.allowed_headers = parse_list(value),
            ["CORS", "EXPOSE_HEADERS"] => config.cors.expose_headers = parse_list(value),
            ["CORS", "ALLOW_CREDENTIALS"] => {
                config.cors.allow_credentials = parse_bool(key, value)?;
            }
            ["CORS", "MAX_AGE_SECS"] => config.cors.max_age_secs = parse_num(key, value)?,

            ["CSRF", "ENABLED"] => config.csrf.enabled = parse_bool(key, value)?,
            ["CSRF", "COOKIE_NAME"] => config.csrf.cookie_name = value.to_string(),
            ["CSRF", "HEADER_NAME"] => config.csrf.header_name = value.to_string(),
            ["CSRF", "FORM_FIELD"] => config.csrf.form_field = value.to_string(),

            // unrelated variables sharing the prefix
            _ => {}
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_parse_error(key, "expected boolean")),
    }
}

fn parse_num<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected a number"))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
