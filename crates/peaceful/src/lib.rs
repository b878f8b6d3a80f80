//! # Peaceful
//!
//! **An embeddable HTTP request dispatcher.**
//!
//! Peaceful matches requests to handlers by method and typed URL pattern,
//! runs them through an ordered middleware chain and hands the handler a
//! strongly typed [`RequestContext`]. It does not listen on sockets; the host
//! converts its own requests into [`Request`] and calls
//! [`Router::dispatch`].
//!
//! - **Typed routes**: `/users/{id:int}/posts/{slug:slug}`, with custom
//!   types registered at startup
//! - **First match wins**: routes are tried in registration order
//! - **Layered middleware**: global → group → route → handler
//! - **Standard stages**: response cache, CORS, CSRF, rate limiting, bearer
//!   auth, request IDs, access logs, content negotiation
//! - **Configuration**: TOML/JSON files plus environment overrides
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use peaceful::prelude::*;
//! use peaceful::stages::CacheMiddleware;
//! use http::StatusCode;
//!
//! #[derive(serde::Serialize)]
//! struct Item {
//!     id: u64,
//! }
//!
//! # tokio_test::block_on(async {
//! let mut router = Router::with_config(&PeacefulConfig::default());
//!
//! let cache: BoxedMiddleware = Arc::new(CacheMiddleware::new(Duration::from_secs(30)));
//! router
//!     .group("v1")
//!     .add_route(
//!         Method::GET,
//!         "/items/{id:int}",
//!         handler_fn(|ctx, req| async move {
//!             let id = ctx.param_as::<u64>("id").unwrap_or_default();
//!             respond(req.headers(), StatusCode::OK, &Item { id })
//!         }),
//!         vec![cache],
//!     )
//!     .unwrap();
//!
//! let router = Arc::new(router);
//! let request = http::Request::get("/api/v1/items/7")
//!     .header("accept", "application/json")
//!     .body(Default::default())
//!     .unwrap();
//! let response = router.dispatch(request).await;
//! assert_eq!(response.status(), StatusCode::OK);
//! # });
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → global[..] → group[..] → route[..] → handler
//!                                                  ↓
//! Response ← global[..] ← group[..] ← route[..] ←──┘
//! ```
//!
//! Unmatched requests go through the global chain to a `404 page not found`
//! response.

#![doc(html_root_url = "https://docs.rs/peaceful/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod respond;
mod router;
pub mod stack;

pub use peaceful_config as config;
pub use peaceful_core as core;
pub use peaceful_middleware as middleware;
pub use peaceful_middleware::stages;
pub use peaceful_router as routing;
pub use peaceful_telemetry as telemetry;

pub use peaceful_config::{ConfigError, ConfigLoader, PeacefulConfig};
pub use peaceful_core::{MediaType, Params, Principal, RequestContext, RequestId};
pub use peaceful_middleware::{
    compose, handler_fn, BoxFuture, BoxedHandler, BoxedMiddleware, Chain, FnMiddleware,
    Middleware, Next, Request, Response, ResponseExt,
};
pub use peaceful_router::{RouterError, RouterResult, TypeRegistry};

pub use respond::{respond, respond_as, Format, RespondError};
pub use router::{RouteGroup, Router, GROUP_PREFIX};
pub use stack::global_chain;

/// Installs the `tracing` subscriber described by the logging section.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: &PeacefulConfig) -> peaceful_telemetry::TelemetryResult<()> {
    peaceful_telemetry::logging::init_logging(&config.logging.to_log_config())
}

/// Common imports for applications.
///
/// # Example
///
/// ```rust
/// use peaceful::prelude::*;
///
/// let router = Router::new();
/// assert_eq!(router.route_count(), 0);
/// ```
pub mod prelude {
    pub use crate::{
        handler_fn, respond, BoxedHandler, BoxedMiddleware, Middleware, PeacefulConfig, Request,
        RequestContext, Response, ResponseExt, RouteGroup, Router,
    };
    pub use http::Method;
}
