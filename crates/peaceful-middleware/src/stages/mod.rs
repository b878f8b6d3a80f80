//! Standard middleware stages.
//!
//! Every stage implements [`Middleware`](crate::Middleware) and can be placed
//! at any level (global, group or route) in any order. The order the
//! dispatcher installs from configuration is:
//!
//! 1. [`request_id`] - assign a request ID and echo it back
//! 2. [`logging`] - one line per request with status and latency
//! 3. [`cors`] - answer preflights, decorate cross-origin responses
//! 4. [`rate_limit`] - per-client token bucket
//! 5. [`csrf`] - double-submit cookie check
//! 6. [`content_negotiation`] - pick JSON, XML or HTML from `Accept`
//!
//! [`cache`] and [`auth`] are attached per route or group.

pub mod auth;
pub mod cache;
pub mod content_negotiation;
pub mod cors;
pub mod csrf;
pub mod logging;
pub mod rate_limit;
pub mod request_id;

pub use auth::{AuthError, AuthMiddleware, StaticTokenValidator, TokenValidator};
pub use cache::{CacheConfig, CacheEntry, CacheMiddleware, CacheStats, ResponseCache};
pub use content_negotiation::ContentNegotiationMiddleware;
pub use cors::{AllowedOrigins, CorsBuilder, CorsConfig, CorsMiddleware};
pub use csrf::{generate_csrf_token, issue_csrf_token, CsrfBuilder, CsrfConfig, CsrfMiddleware};
pub use logging::LoggingMiddleware;
pub use rate_limit::{KeyExtractor, RateLimitBuilder, RateLimitConfig, RateLimitMiddleware};
pub use request_id::{RequestIdMiddleware, REQUEST_ID_HEADER};
