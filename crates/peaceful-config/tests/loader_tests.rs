//! File-based loading tests.

use std::io::Write;

use peaceful_config::{ConfigError, ConfigLoader, LogFormat};
use tempfile::Builder;

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_loads_toml_file() {
    let file = write_temp(
        ".toml",
        r#"
            [logging]
            level = "warn"
            format = "pretty"

            [cors]
            enabled = true
            allowed_origins = ["https://app.example.com"]
            allow_credentials = true
            max_age_secs = 600

            [csrf]
            enabled = true
            header_name = "X-XSRF-Token"
        "#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert!(config.cors.enabled);
    assert_eq!(config.cors.max_age_secs, 600);
    assert_eq!(config.csrf.header_name, "X-XSRF-Token");
    // untouched sections keep defaults
    assert_eq!(config.cache.ttl_secs, 60);
}

#[test]
fn test_loads_json_file() {
    let file = write_temp(".json", r#"{"cache": {"ttl_secs": 120, "max_entries": 50}}"#);

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(config.cache.ttl_secs, 120);
    assert_eq!(config.cache.max_entries, Some(50));
}

#[test]
fn test_rejects_unknown_extension() {
    let file = write_temp(".yaml", "cache: {}");
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_rejects_invalid_file_contents_on_load() {
    let file = write_temp(
        ".toml",
        r#"
            [cors]
            allowed_origins = ["*"]
            allow_credentials = true
        "#,
    );

    let result = ConfigLoader::new().with_file(file.path()).unwrap().load();
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_env_overrides_file() {
    let file = write_temp(".toml", "[rate_limit]\nenabled = true\nburst = 3\n");

    let config = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .with_env_prefix("PEACEFUL_TEST")
        .with_env_vars([("PEACEFUL_TEST__RATE_LIMIT__BURST", "8")])
        .load()
        .unwrap();

    assert!(config.rate_limit.enabled);
    assert_eq!(config.rate_limit.burst, 8);
}
