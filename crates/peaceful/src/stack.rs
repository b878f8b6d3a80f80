//! Building middleware from configuration.

use std::sync::Arc;
use std::time::Duration;

use http::Method;
use peaceful_config::{CacheConfig, CorsConfig, CsrfConfig, PeacefulConfig, RateLimitConfig};
use peaceful_middleware::stages::{
    self, CacheMiddleware, ContentNegotiationMiddleware, CorsMiddleware, CsrfMiddleware,
    LoggingMiddleware, RateLimitMiddleware, RequestIdMiddleware, ResponseCache,
};
use peaceful_middleware::Chain;

/// Builds the global chain described by `config`.
///
/// Order: request ID, access log, CORS, rate limiting, CSRF, content
/// negotiation. Disabled sections are left out. The access log follows
/// `logging.access_log`, not `logging.enabled`, which only concerns the
/// subscriber.
#[must_use]
pub fn global_chain(config: &PeacefulConfig) -> Chain {
    let mut chain = Chain::new();
    chain.push(RequestIdMiddleware::new());
    if config.logging.access_log {
        chain.push(LoggingMiddleware);
    }
    if config.cors.enabled {
        chain.push(cors(&config.cors));
    }
    if config.rate_limit.enabled {
        chain.push(rate_limit(&config.rate_limit));
    }
    if config.csrf.enabled {
        chain.push(csrf(&config.csrf));
    }
    chain.push(ContentNegotiationMiddleware::new());

    tracing::debug!(stages = ?chain.names(), "global middleware installed from configuration");
    chain
}

/// Builds a CORS stage.
#[must_use]
pub fn cors(config: &CorsConfig) -> CorsMiddleware {
    let methods = config.allowed_methods.iter().filter_map(|m| {
        let parsed = m.parse::<Method>().ok();
        if parsed.is_none() {
            tracing::warn!(method = %m, "ignoring invalid CORS method");
        }
        parsed
    });

    CorsMiddleware::builder()
        .allow_origins(config.allowed_origins.iter().cloned())
        .allow_methods(methods)
        .allow_headers(config.allowed_headers.iter().cloned())
        .expose_headers(config.expose_headers.iter().cloned())
        .allow_credentials(config.allow_credentials)
        .max_age(Duration::from_secs(config.max_age_secs))
        .build()
}

/// Builds a rate limiting stage keyed by client address.
#[must_use]
pub fn rate_limit(config: &RateLimitConfig) -> RateLimitMiddleware {
    RateLimitMiddleware::builder()
        .per_second(config.per_second)
        .burst(config.burst)
        .per_ip()
        .build()
}

/// Builds a CSRF stage.
#[must_use]
pub fn csrf(config: &CsrfConfig) -> CsrfMiddleware {
    CsrfMiddleware::builder()
        .cookie_name(config.cookie_name.as_str())
        .header_name(config.header_name.as_str())
        .form_field(config.form_field.as_str())
        .build()
}

/// Builds a caching stage, or `None` when caching is disabled.
///
/// Each call creates its own store; share one by cloning the returned stage.
#[must_use]
pub fn cache(config: &CacheConfig) -> Option<CacheMiddleware> {
    if !config.enabled {
        return None;
    }
    let store = ResponseCache::with_config(stages::CacheConfig {
        max_entries: config.max_entries,
    });
    Some(CacheMiddleware::with_store(
        Arc::new(store),
        Duration::from_secs(config.ttl_secs),
    ))
}
