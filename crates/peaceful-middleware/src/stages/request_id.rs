//! Request ID stage.
//!
//! Assigns each request a UUID v7, stores it in the [`RequestContext`] and
//! echoes it back in the `X-Request-ID` response header so clients can quote
//! it when reporting problems.

use http::HeaderValue;
use peaceful_core::{RequestContext, RequestId};

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};

/// The header carrying the request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that assigns request IDs.
///
/// By default a fresh ID is generated for every request. With
/// [`RequestIdMiddleware::trust_incoming`], a well-formed UUID in the
/// incoming `X-Request-ID` header is kept instead.
#[derive(Debug, Clone, Default)]
pub struct RequestIdMiddleware {
    trust_incoming: bool,
}

impl RequestIdMiddleware {
    /// Creates a middleware that always generates a new ID.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a middleware that reuses a valid incoming `X-Request-ID`.
    ///
    /// Only appropriate behind a proxy that sets or strips the header.
    #[must_use]
    pub fn trust_incoming() -> Self {
        Self { trust_incoming: true }
    }

    fn incoming_id(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|s| s.parse().ok())
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let request_id = self.incoming_id(&request).unwrap_or_else(RequestId::new);
            ctx.set_request_id(request_id);

            let mut response = next.run(ctx, request).await;
            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;

    fn request_with_id(id: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/test");
        if let Some(id) = id {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    fn handler() -> impl FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, Response> {
        |_ctx, _req| Box::pin(async { Response::text(StatusCode::OK, "OK") })
    }

    fn header(response: &Response) -> &str {
        response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_generates_id_and_sets_header() {
        let middleware = RequestIdMiddleware::new();
        let mut ctx = RequestContext::new();

        let response = middleware
            .process(&mut ctx, request_with_id(None), Next::handler(handler()))
            .await;

        assert_eq!(ctx.request_id().to_string(), header(&response));
        assert_eq!(ctx.request_id().as_uuid().get_version_num(), 7);
    }

    #[tokio::test]
    async fn test_ignores_incoming_id_by_default() {
        let middleware = RequestIdMiddleware::new();
        let mut ctx = RequestContext::new();
        let incoming = "01234567-89ab-7def-8123-456789abcdef";

        let response = middleware
            .process(&mut ctx, request_with_id(Some(incoming)), Next::handler(handler()))
            .await;

        assert_ne!(header(&response), incoming);
    }

    #[tokio::test]
    async fn test_trusted_incoming_id_is_kept() {
        let middleware = RequestIdMiddleware::trust_incoming();
        let mut ctx = RequestContext::new();
        let incoming = "01234567-89ab-7def-8123-456789abcdef";

        let response = middleware
            .process(&mut ctx, request_with_id(Some(incoming)), Next::handler(handler()))
            .await;

        assert_eq!(header(&response), incoming);
        assert_eq!(ctx.request_id().to_string(), incoming);
    }

    #[tokio::test]
    async fn test_malformed_incoming_id_is_replaced() {
        let middleware = RequestIdMiddleware::trust_incoming();
        let mut ctx = RequestContext::new();

        let response = middleware
            .process(&mut ctx, request_with_id(Some("nope")), Next::handler(handler()))
            .await;

        assert_ne!(header(&response), "nope");
        assert!(header(&response).parse::<RequestId>().is_ok());
    }
}
