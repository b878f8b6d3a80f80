//! Per-client token bucket rate limiting.
//!
//! Each client key owns a bucket holding up to `burst` tokens that refills
//! continuously at `per_second` tokens per second. A request spends one
//! token; an empty bucket answers `429 Too Many Requests` with a
//! `Retry-After` hint and the handler is not called.
//!
//! ## Response headers
//!
//! - `X-RateLimit-Limit`: bucket capacity
//! - `X-RateLimit-Remaining`: whole tokens left after this request
//! - `Retry-After`: seconds until a token is available (rejections only)
//!
//! # Example
//!
//! ```
//! use peaceful_middleware::stages::RateLimitMiddleware;
//!
//! let limiter = RateLimitMiddleware::builder()
//!     .per_second(2.0)
//!     .burst(10)
//!     .per_header("x-api-key")
//!     .build();
//! assert_eq!(limiter.config().burst(), 10);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderValue, StatusCode};
use peaceful_core::RequestContext;
use peaceful_telemetry::metrics;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};

/// Rate limit header names.
pub mod headers {
    /// `X-RateLimit-Limit` header.
    pub const LIMIT: &str = "x-ratelimit-limit";
    /// `X-RateLimit-Remaining` header.
    pub const REMAINING: &str = "x-ratelimit-remaining";
    /// `Retry-After` header.
    pub const RETRY_AFTER: &str = "retry-after";
}

/// Key used when no client address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// How the bucket key is derived from a request.
#[derive(Clone, Default)]
pub enum KeyExtractor {
    /// First `X-Forwarded-For` entry, then `X-Real-IP`, then the remote
    /// address, then [`UNKNOWN_CLIENT`].
    #[default]
    Ip,
    /// The value of a header; requests without it are not limited.
    Header(String),
    /// The authenticated principal; anonymous requests are not limited.
    Principal,
    /// A custom function; `None` means the request is not limited.
    Custom(Arc<dyn Fn(&RequestContext, &Request) -> Option<String> + Send + Sync>),
    /// One bucket shared by every request.
    Global,
}

impl std::fmt::Debug for KeyExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ip => write!(f, "KeyExtractor::Ip"),
            Self::Header(h) => f.debug_tuple("KeyExtractor::Header").field(h).finish(),
            Self::Principal => write!(f, "KeyExtractor::Principal"),
            Self::Custom(_) => write!(f, "KeyExtractor::Custom(<fn>)"),
            Self::Global => write!(f, "KeyExtractor::Global"),
        }
    }
}

impl KeyExtractor {
    fn extract(&self, ctx: &RequestContext, request: &Request) -> Option<String> {
        match self {
            Self::Ip => Some(client_ip(ctx, request)),
            Self::Header(name) => request
                .headers()
                .get(name.as_str())
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            Self::Principal => ctx.principal().map(|p| p.subject().to_string()),
            Self::Custom(f) => f(ctx, request),
            Self::Global => Some("global".to_string()),
        }
    }
}

/// Resolves the client address the way proxies report it.
#[must_use]
pub fn client_ip(ctx: &RequestContext, request: &Request) -> String {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }
    ctx.remote_addr()
        .map_or_else(|| UNKNOWN_CLIENT.to_string(), |addr| addr.ip().to_string())
}

/// Bucket parameters.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    per_second: f64,
    burst: u32,
    key_extractor: KeyExtractor,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 1.0,
            burst: 5,
            key_extractor: KeyExtractor::Ip,
        }
    }
}

impl RateLimitConfig {
    /// Returns the refill rate in tokens per second.
    #[must_use]
    pub fn per_second(&self) -> f64 {
        self.per_second
    }

    /// Returns the bucket capacity.
    #[must_use]
    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Returns the key extractor.
    #[must_use]
    pub fn key_extractor(&self) -> &KeyExtractor {
        &self.key_extractor
    }
}

/// Builder for [`RateLimitMiddleware`].
#[derive(Debug, Clone, Default)]
pub struct RateLimitBuilder {
    config: RateLimitConfig,
}

impl RateLimitBuilder {
    /// Sets the refill rate. Non-positive or non-finite rates are ignored.
    #[must_use]
    pub fn per_second(mut self, rate: f64) -> Self {
        if rate.is_finite() && rate > 0.0 {
            self.config.per_second = rate;
        }
        self
    }

    /// Sets the bucket capacity, at least one.
    #[must_use]
    pub fn burst(mut self, burst: u32) -> Self {
        self.config.burst = burst.max(1);
        self
    }

    /// Keys buckets by client address.
    #[must_use]
    pub fn per_ip(mut self) -> Self {
        self.config.key_extractor = KeyExtractor::Ip;
        self
    }

    /// Keys buckets by a header value.
    #[must_use]
    pub fn per_header(mut self, name: impl Into<String>) -> Self {
        self.config.key_extractor = KeyExtractor::Header(name.into().to_ascii_lowercase());
        self
    }

    /// Keys buckets by authenticated principal.
    #[must_use]
    pub fn per_principal(mut self) -> Self {
        self.config.key_extractor = KeyExtractor::Principal;
        self
    }

    /// Uses one bucket for everything.
    #[must_use]
    pub fn global(mut self) -> Self {
        self.config.key_extractor = KeyExtractor::Global;
        self
    }

    /// Keys buckets with a custom function.
    #[must_use]
    pub fn key_extractor<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext, &Request) -> Option<String> + Send + Sync + 'static,
    {
        self.config.key_extractor = KeyExtractor::Custom(Arc::new(f));
        self
    }

    /// Builds the middleware.
    #[must_use]
    pub fn build(self) -> RateLimitMiddleware {
        RateLimitMiddleware {
            config: self.config,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Token bucket middleware. Clones share their buckets.
#[derive(Debug, Clone)]
pub struct RateLimitMiddleware {
    config: RateLimitConfig,
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
}

impl Default for RateLimitMiddleware {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RateLimitMiddleware {
    /// Returns a builder starting at 1 token per second with a burst of 5.
    #[must_use]
    pub fn builder() -> RateLimitBuilder {
        RateLimitBuilder::default()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    async fn take(&self, key: &str) -> Decision {
        let capacity = f64::from(self.config.burst);
        let rate = self.config.per_second;
        let now = Instant::now();

        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: capacity,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = elapsed.mul_add(rate, bucket.tokens).min(capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Decision::Allowed {
                remaining: bucket.tokens.floor() as u32,
            }
        } else {
            let wait = (1.0 - bucket.tokens) / rate;
            Decision::Limited {
                retry_after: Duration::from_secs_f64(wait),
            }
        }
    }

    fn limited_response(&self, retry_after: Duration) -> Response {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let seconds = retry_after.as_secs_f64().ceil().max(1.0) as u64;
        let mut response = Response::error(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests");
        let headers = response.headers_mut();
        headers.insert(headers::LIMIT, HeaderValue::from(self.config.burst));
        headers.insert(headers::REMAINING, HeaderValue::from_static("0"));
        headers.insert(headers::RETRY_AFTER, HeaderValue::from(seconds));
        response
    }
}

impl Middleware for RateLimitMiddleware {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let Some(key) = self.config.key_extractor.extract(ctx, &request) else {
                return next.run(ctx, request).await;
            };

            match self.take(&key).await {
                Decision::Allowed { remaining } => {
                    let mut response = next.run(ctx, request).await;
                    let headers = response.headers_mut();
                    headers.insert(headers::LIMIT, HeaderValue::from(self.config.burst));
                    headers.insert(headers::REMAINING, HeaderValue::from(remaining));
                    response
                }
                Decision::Limited { retry_after } => {
                    metrics::record_rate_limited();
                    tracing::warn!(
                        client = %key,
                        request_id = %ctx.request_id(),
                        retry_after = ?retry_after,
                        "rate limit exceeded"
                    );
                    self.limited_response(retry_after)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;
    use std::net::SocketAddr;

    fn request_with(headers: &[(&str, &str)]) -> Request {
        let mut builder = http::Request::builder().uri("/limited");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    fn ok_handler<'a>() -> Next<'a> {
        Next::handler(|_ctx, _req| Box::pin(async { Response::text(StatusCode::OK, "OK") }))
    }

    async fn hit(limiter: &RateLimitMiddleware, request: Request) -> Response {
        let mut ctx = RequestContext::new();
        limiter.process(&mut ctx, request, ok_handler()).await
    }

    #[test]
    fn test_client_ip_precedence() {
        let ctx = RequestContext::new()
            .with_remote_addr("10.0.0.9:5000".parse::<SocketAddr>().unwrap());

        let xff = request_with(&[("x-forwarded-for", "203.0.113.1, 10.0.0.1"), ("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_ip(&ctx, &xff), "203.0.113.1");

        let real = request_with(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_ip(&ctx, &real), "198.51.100.2");

        let bare = request_with(&[]);
        assert_eq!(client_ip(&ctx, &bare), "10.0.0.9");
        assert_eq!(client_ip(&RequestContext::new(), &bare), UNKNOWN_CLIENT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_limited() {
        let limiter = RateLimitMiddleware::default();

        for expected_remaining in (0..5).rev() {
            let response = hit(&limiter, request_with(&[("x-real-ip", "1.1.1.1")])).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers().get(headers::REMAINING).unwrap(),
                &expected_remaining.to_string()
            );
        }

        let response = hit(&limiter, request_with(&[("x-real-ip", "1.1.1.1")])).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(headers::RETRY_AFTER).unwrap(), "1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_refills() {
        let limiter = RateLimitMiddleware::builder().burst(1).build();
        let request = || request_with(&[("x-real-ip", "2.2.2.2")]);

        assert_eq!(hit(&limiter, request()).await.status(), StatusCode::OK);
        assert_eq!(hit(&limiter, request()).await.status(), StatusCode::TOO_MANY_REQUESTS);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(hit(&limiter, request()).await.status(), StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_are_independent() {
        let limiter = RateLimitMiddleware::builder().burst(1).build();

        let a = hit(&limiter, request_with(&[("x-real-ip", "3.3.3.3")])).await;
        let b = hit(&limiter, request_with(&[("x-real-ip", "4.4.4.4")])).await;
        assert_eq!(a.status(), StatusCode::OK);
        assert_eq!(b.status(), StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_header_key_missing_is_not_limited() {
        let limiter = RateLimitMiddleware::builder().burst(1).per_header("X-Api-Key").build();

        for _ in 0..3 {
            assert_eq!(hit(&limiter, request_with(&[])).await.status(), StatusCode::OK);
        }
        assert_eq!(
            hit(&limiter, request_with(&[("x-api-key", "k")])).await.status(),
            StatusCode::OK
        );
        assert_eq!(
            hit(&limiter, request_with(&[("x-api-key", "k")])).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_builder_ignores_invalid_values() {
        let limiter = RateLimitMiddleware::builder()
            .per_second(0.0)
            .per_second(f64::NAN)
            .burst(0)
            .build();
        assert!((limiter.config().per_second() - 1.0).abs() < f64::EPSILON);
        assert_eq!(limiter.config().burst(), 1);
    }

    #[test]
    fn test_key_extractor_debug() {
        let limiter = RateLimitMiddleware::builder()
            .key_extractor(|_ctx, _req| Some("k".into()))
            .build();
        assert_eq!(
            format!("{:?}", limiter.config().key_extractor()),
            "KeyExtractor::Custom(<fn>)"
        );
    }
}
