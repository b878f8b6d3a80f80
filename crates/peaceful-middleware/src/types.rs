//! Request, response and handler types shared by the chain and its stages.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http::{header, StatusCode};
use http_body_util::Full;
use peaceful_core::RequestContext;

use crate::middleware::BoxFuture;

/// The HTTP request type flowing through the chain.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type flowing through the chain.
pub type Response = http::Response<Full<Bytes>>;

/// A terminal handler: receives the request context and the request, and
/// produces the response.
pub type BoxedHandler =
    Arc<dyn Fn(RequestContext, Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Adapts an async closure into a [`BoxedHandler`].
///
/// # Example
///
/// ```
/// use peaceful_middleware::{handler_fn, Response, ResponseExt};
/// use http::StatusCode;
///
/// let handler = handler_fn(|ctx, _req| async move {
///     Response::text(StatusCode::OK, format!("user {}", ctx.param("id")))
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(RequestContext, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(
        move |ctx: RequestContext, request: Request| -> BoxFuture<'static, Response> {
            Box::pin(f(ctx, request))
        },
    )
}

/// Convenience constructors for plain responses.
pub trait ResponseExt {
    /// A `text/plain` response.
    fn text(status: StatusCode, body: impl Into<String>) -> Response;

    /// An error response whose body is `message` followed by a newline.
    fn error(status: StatusCode, message: &str) -> Response;

    /// The standard 404 response.
    fn not_found() -> Response;
}

impl ResponseExt for Response {
    fn text(status: StatusCode, body: impl Into<String>) -> Response {
        http::Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Full::new(Bytes::from(body.into())))
            .expect("failed to build text response")
    }

    fn error(status: StatusCode, message: &str) -> Response {
        let mut response = Self::text(status, format!("{message}\n"));
        response.headers_mut().insert(
            header::X_CONTENT_TYPE_OPTIONS,
            header::HeaderValue::from_static("nosniff"),
        );
        response
    }

    fn not_found() -> Response {
        Self::error(StatusCode::NOT_FOUND, "404 page not found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_error_response() {
        let response = Response::error(StatusCode::FORBIDDEN, "Forbidden");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "Forbidden\n");
    }

    #[tokio::test]
    async fn test_not_found() {
        let response = Response::not_found();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "404 page not found\n");
    }

    #[tokio::test]
    async fn test_handler_fn_receives_context() {
        let handler = handler_fn(|ctx, _req| async move {
            Response::text(StatusCode::OK, ctx.request_id().to_string())
        });

        let ctx = RequestContext::new();
        let id = ctx.request_id().to_string();
        let request = http::Request::new(Full::new(Bytes::new()));

        let response = handler(ctx, request).await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, id.as_bytes());
    }
}
