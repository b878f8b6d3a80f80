//! # Peaceful Middleware
//!
//! The middleware model of the Peaceful dispatcher and its standard stages.
//!
//! A [`Middleware`] receives the request context, the request and a [`Next`]
//! handle. Layers are kept as plain ordered lists ([`Chain`]) and folded
//! around the terminal handler at dispatch time by [`compose`]:
//!
//! ```text
//! global[0] → global[1] → group[0] → route[0] → handler
//!                                                  ↓
//! global[0] ← global[1] ← group[0] ← route[0] ←────┘
//! ```
//!
//! Any layer may answer on its own instead of calling `next`, which skips
//! every layer below it and the handler.
//!
//! ## Example
//!
//! ```
//! use peaceful_middleware::{handler_fn, Chain, Response, ResponseExt};
//! use peaceful_middleware::stages::{ContentNegotiationMiddleware, RequestIdMiddleware};
//! use peaceful_core::RequestContext;
//! use http::StatusCode;
//!
//! # tokio_test::block_on(async {
//! let mut chain = Chain::new();
//! chain
//!     .push(RequestIdMiddleware::new())
//!     .push(ContentNegotiationMiddleware);
//!
//! let handler = handler_fn(|ctx, _req| async move {
//!     Response::text(StatusCode::OK, ctx.media_type().to_string())
//! });
//! let request = http::Request::builder()
//!     .header("accept", "application/json")
//!     .body(Default::default())
//!     .unwrap();
//!
//! let response = chain.run(RequestContext::new(), request, handler).await;
//! assert_eq!(response.status(), StatusCode::OK);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/peaceful-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

pub use middleware::{BoxFuture, FnMiddleware, Middleware, Next};
pub use pipeline::{compose, BoxedMiddleware, Chain};
pub use types::{handler_fn, BoxedHandler, Request, Response, ResponseExt};
