//! Metric names and recording helpers.
//!
//! Recording goes through the `metrics` facade and is a no-op until the host
//! installs a recorder.

use metrics::{counter, describe_counter};

/// Responses served from the response cache.
pub const CACHE_HITS_TOTAL: &str = "peaceful_cache_hits_total";

/// Cacheable requests that had to reach the handler.
pub const CACHE_MISSES_TOTAL: &str = "peaceful_cache_misses_total";

/// Requests rejected by the rate limiter.
pub const RATE_LIMITED_TOTAL: &str = "peaceful_rate_limited_total";

/// Requests that matched no route.
pub const NOT_FOUND_TOTAL: &str = "peaceful_not_found_total";

/// Registers descriptions for the standard metrics with the installed
/// recorder.
pub fn describe_metrics() {
    describe_counter!(CACHE_HITS_TOTAL, "Responses served from the response cache");
    describe_counter!(
        CACHE_MISSES_TOTAL,
        "Cacheable requests that reached the handler"
    );
    describe_counter!(RATE_LIMITED_TOTAL, "Requests rejected by the rate limiter");
    describe_counter!(NOT_FOUND_TOTAL, "Requests that matched no route");
}

/// Records a response cache hit.
pub fn record_cache_hit() {
    counter!(CACHE_HITS_TOTAL).increment(1);
}

/// Records a response cache miss.
pub fn record_cache_miss() {
    counter!(CACHE_MISSES_TOTAL).increment(1);
}

/// Records a rate limit rejection.
pub fn record_rate_limited() {
    counter!(RATE_LIMITED_TOTAL).increment(1);
}

/// Records a request that matched no route.
pub fn record_not_found(method: &str) {
    counter!(NOT_FOUND_TOTAL, "method" => method.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        describe_metrics();
        record_cache_hit();
        record_cache_miss();
        record_rate_limited();
        record_not_found("GET");
    }
}
