//! Logging and metrics for Peaceful.
//!
//! - **Logging**: structured JSON or pretty output through `tracing-subscriber`
//! - **Metrics**: counters recorded through the `metrics` facade; installing
//!   an exporter is left to the host application
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `peaceful_cache_hits_total` | Counter | - | Responses served from the response cache |
//! | `peaceful_cache_misses_total` | Counter | - | Cacheable requests that reached the handler |
//! | `peaceful_rate_limited_total` | Counter | - | Requests rejected by the rate limiter |
//! | `peaceful_not_found_total` | Counter | `method` | Requests that matched no route |
//!
//! # Example
//!
//! ```rust,ignore
//! use peaceful_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(path = "/users", "dispatcher ready");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
