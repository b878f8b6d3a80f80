//! Typed configuration for the Peaceful dispatcher.
//!
//! - TOML and JSON files
//! - Environment variable overrides
//! - Strict parsing (unknown fields are errors)
//! - Layering: defaults → file → env
//!
//! # Example
//!
//! ```no_run
//! use peaceful_config::ConfigLoader;
//!
//! # fn main() -> Result<(), peaceful_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("peaceful.toml")?
//!     .with_env_prefix("PEACEFUL")
//!     .load()?;
//!
//! println!("cache ttl: {}s", config.cache.ttl_secs);
//! # Ok(())
//! # }
//! ```
//!
//! # File format
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [cache]
//! ttl_secs = 60
//! max_entries = 10000
//!
//! [rate_limit]
//! enabled = true
//! per_second = 1.0
//! burst = 5
//!
//! [cors]
//! enabled = true
//! allowed_origins = ["https://app.example.com"]
//! allow_credentials = true
//!
//! [csrf]
//! enabled = true
//! ```

mod config;
mod error;
mod loader;
mod schema;

pub use config::PeacefulConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{CacheConfig, CorsConfig, CsrfConfig, LogFormat, LoggingConfig, RateLimitConfig};
