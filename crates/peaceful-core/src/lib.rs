//! # Peaceful Core
//!
//! Request-scoped types shared by the dispatcher, the middleware stages and
//! handlers:
//!
//! - [`RequestContext`] - Per-request state: bound path parameters, request
//!   ID, negotiated media type, authenticated principal, timing
//! - [`RequestId`] - UUID v7 request identifier
//! - [`MediaType`] - Outcome of `Accept` header negotiation
//! - [`Principal`] - Subject accepted by an authentication stage

#![doc(html_root_url = "https://docs.rs/peaceful-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod media;
mod principal;

pub use context::{RequestContext, RequestId};
pub use media::MediaType;
pub use peaceful_router::Params;
pub use principal::Principal;
