//! Response caching stage.
//!
//! Successful `GET` responses are stored in a shared [`ResponseCache`] and
//! replayed until their time-to-live runs out. While an entry is fresh the
//! rest of the chain, handler included, is skipped entirely.
//!
//! ## Rules
//!
//! - Only `GET` requests are looked up or stored; other methods pass through
//! - Only status `200 OK` is stored; any other status passes through untouched
//! - The key is the method plus the request URI's path and query, so
//!   `/items?page=1` and `/items?page=2` are different entries
//! - Expiry is checked when an entry is read; stale entries stay in the map
//!   until they are overwritten or evicted
//!
//! ## Concurrency
//!
//! Lookups take a shared read lock, stores take the exclusive write lock.
//! Two concurrent misses for the same key both reach the handler and the
//! later store wins; readers never observe a partially written entry.
//!
//! # Example
//!
//! ```
//! use peaceful_middleware::stages::CacheMiddleware;
//! use std::time::Duration;
//!
//! let cache = CacheMiddleware::new(Duration::from_secs(30));
//! assert!(cache.store().is_empty());
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use parking_lot::RwLock;
use peaceful_core::RequestContext;
use peaceful_telemetry::metrics;
use tokio::time::Instant;

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};

/// Configuration for a [`ResponseCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Upper bound on stored entries. `None` leaves the cache unbounded.
    pub max_entries: Option<usize>,
}

/// A stored response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    body: Bytes,
    headers: HeaderMap,
    expires_at: Instant,
}

impl CacheEntry {
    /// Returns the stored body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the stored headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns when the entry stops being served.
    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    fn to_response(&self) -> Response {
        let mut response = http::Response::new(Full::new(self.body.clone()));
        *response.headers_mut() = self.headers.clone();
        response
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing fresh.
    pub misses: u64,
    /// Entries removed to stay within `max_entries`.
    pub evictions: u64,
    /// Entries currently held, stale ones included.
    pub size: usize,
}

/// Shared store of cached responses.
///
/// One store may back several [`CacheMiddleware`] instances, e.g. one per
/// route group with different TTLs.
#[derive(Debug, Default)]
pub struct ResponseCache {
    config: CacheConfig,
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResponseCache {
    /// Creates an unbounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache with the given configuration.
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Returns the fresh entry stored under `key`.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let now = Instant::now();
        let entry = self
            .entries
            .read()
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .cloned();

        if entry.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        entry
    }

    /// Stores a response under `key` for `ttl`, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, body: Bytes, headers: HeaderMap, ttl: Duration) {
        let key = key.into();
        let now = Instant::now();
        let entry = CacheEntry {
            body,
            headers,
            expires_at: now + ttl,
        };

        let mut entries = self.entries.write();
        if let Some(max) = self.config.max_entries {
            if !entries.contains_key(&key) {
                self.make_room(&mut entries, max, now);
            }
        }
        entries.insert(key, entry);
    }

    /// Evicts expired entries first, then the entries closest to expiry,
    /// until one more entry fits.
    fn make_room(&self, entries: &mut HashMap<String, CacheEntry>, max: usize, now: Instant) {
        if entries.len() < max {
            return;
        }

        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        let mut evicted = before - entries.len();

        while !entries.is_empty() && entries.len() >= max {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    entries.remove(&key);
                    evicted += 1;
                }
                None => break,
            }
        }

        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        }
    }

    /// Returns the number of stored entries, stale ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns a snapshot of the cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}

/// Middleware that serves and stores successful `GET` responses.
#[derive(Debug, Clone)]
pub struct CacheMiddleware {
    store: Arc<ResponseCache>,
    ttl: Duration,
}

impl CacheMiddleware {
    /// Creates a caching stage with its own unbounded store.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_store(Arc::new(ResponseCache::new()), ttl)
    }

    /// Creates a caching stage backed by a shared store.
    #[must_use]
    pub fn with_store(store: Arc<ResponseCache>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<ResponseCache> {
        &self.store
    }

    /// Returns the time-to-live of stored entries.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Builds the cache key for a request.
    #[must_use]
    pub fn cache_key(request: &Request) -> String {
        let target = request
            .uri()
            .path_and_query()
            .map_or_else(|| request.uri().path(), |pq| pq.as_str());
        format!("{} {}", request.method(), target)
    }
}

impl Middleware for CacheMiddleware {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if request.method() != Method::GET {
                return next.run(ctx, request).await;
            }

            let key = Self::cache_key(&request);
            if let Some(entry) = self.store.get(&key) {
                metrics::record_cache_hit();
                tracing::debug!(cache_key = %key, "cache hit");
                return entry.to_response();
            }
            metrics::record_cache_miss();

            let response = next.run(ctx, request).await;
            if response.status() != StatusCode::OK {
                tracing::trace!(cache_key = %key, status = response.status().as_u16(), "not cached");
                return response;
            }

            let (parts, body) = response.into_parts();
            let bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };

            self.store
                .insert(key.as_str(), bytes.clone(), parts.headers.clone(), self.ttl);
            tracing::debug!(cache_key = %key, ttl_secs = self.ttl.as_secs(), "response cached");

            Response::from_parts(parts, Full::new(bytes))
        })
    }
}
