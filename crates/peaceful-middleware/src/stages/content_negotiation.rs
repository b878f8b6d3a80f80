//! Content negotiation stage.
//!
//! Reads the `Accept` header once, records the outcome as a [`MediaType`] in
//! the context, and labels the response with that type when the handler did
//! not set a `Content-Type` of its own.

use http::{header, HeaderValue};
use peaceful_core::{MediaType, RequestContext};

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};

/// Middleware that negotiates the response representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentNegotiationMiddleware;

impl ContentNegotiationMiddleware {
    /// Creates the negotiation stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Negotiates a media type for `request`.
    #[must_use]
    pub fn negotiate(request: &Request) -> MediaType {
        request
            .headers()
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map_or_else(MediaType::default, MediaType::from_accept)
    }
}

impl Middleware for ContentNegotiationMiddleware {
    fn name(&self) -> &'static str {
        "content_negotiation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let media_type = Self::negotiate(&request);
            ctx.set_media_type(media_type);

            let mut response = next.run(ctx, request).await;
            response
                .headers_mut()
                .entry(header::CONTENT_TYPE)
                .or_insert_with(|| HeaderValue::from_static(media_type.content_type()));
            response
        })
    }
}
