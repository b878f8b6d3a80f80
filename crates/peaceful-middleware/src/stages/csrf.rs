//! Double-submit cookie CSRF protection.
//!
//! Safe methods pass untouched. Any other request must carry a non-empty
//! token cookie whose value equals either the token header or, when the
//! header is absent, the token field of a url-encoded form body. Anything
//! else is refused with `403 Forbidden`.
//!
//! Tokens are handed out with [`issue_csrf_token`], usually from the handler
//! that renders the form.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use http::{header, HeaderValue, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use peaceful_core::RequestContext;
use rand::RngCore;

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};

/// Default cookie carrying the token.
pub const DEFAULT_COOKIE_NAME: &str = "csrf_token";
/// Default header carrying the submitted token.
pub const DEFAULT_HEADER_NAME: &str = "x-csrf-token";
/// Default form field carrying the submitted token.
pub const DEFAULT_FORM_FIELD: &str = "csrf_token";

const TOKEN_BYTES: usize = 32;

/// Names and methods used by [`CsrfMiddleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfConfig {
    /// Cookie holding the expected token.
    pub cookie_name: String,
    /// Header holding the submitted token.
    pub header_name: String,
    /// Form field holding the submitted token.
    pub form_field: String,
    /// Methods that are never checked.
    pub safe_methods: Vec<Method>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            header_name: DEFAULT_HEADER_NAME.to_string(),
            form_field: DEFAULT_FORM_FIELD.to_string(),
            safe_methods: vec![Method::GET, Method::HEAD, Method::OPTIONS],
        }
    }
}

/// Builder for [`CsrfMiddleware`].
#[derive(Debug, Clone, Default)]
pub struct CsrfBuilder {
    config: CsrfConfig,
}

impl CsrfBuilder {
    /// Sets the cookie name.
    #[must_use]
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.config.cookie_name = name.into();
        self
    }

    /// Sets the header name.
    #[must_use]
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.config.header_name = name.into().to_ascii_lowercase();
        self
    }

    /// Sets the form field name.
    #[must_use]
    pub fn form_field(mut self, name: impl Into<String>) -> Self {
        self.config.form_field = name.into();
        self
    }

    /// Replaces the methods that skip the check.
    #[must_use]
    pub fn safe_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.config.safe_methods = methods.into_iter().collect();
        self
    }

    /// Builds the middleware.
    #[must_use]
    pub fn build(self) -> CsrfMiddleware {
        CsrfMiddleware {
            config: Arc::new(self.config),
        }
    }
}

/// Middleware enforcing the double-submit check.
#[derive(Debug, Clone, Default)]
pub struct CsrfMiddleware {
    config: Arc<CsrfConfig>,
}

impl CsrfMiddleware {
    /// Creates the middleware with default names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder() -> CsrfBuilder {
        CsrfBuilder::default()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    fn cookie_token(&self, request: &Request) -> Option<String> {
        request
            .headers()
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.config.cookie_name)
            .map(|(_, value)| value.trim_matches('"').to_string())
            .filter(|value| !value.is_empty())
    }

    fn header_token(&self, request: &Request) -> Option<String> {
        request
            .headers()
            .get(self.config.header_name.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn form_token(&self, body: &[u8]) -> Option<String> {
        url::form_urlencoded::parse(body)
            .find(|(name, _)| *name == self.config.form_field)
            .map(|(_, value)| value.into_owned())
    }
}

fn is_form(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"))
}

/// Compares two tokens without short-circuiting on the first difference.
fn tokens_match(expected: &str, submitted: &str) -> bool {
    let (a, b) = (expected.as_bytes(), submitted.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl Middleware for CsrfMiddleware {
    fn name(&self) -> &'static str {
        "csrf"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if self.config.safe_methods.contains(request.method()) {
                return next.run(ctx, request).await;
            }

            let Some(expected) = self.cookie_token(&request) else {
                tracing::warn!(request_id = %ctx.request_id(), "csrf cookie missing");
                return Response::error(StatusCode::FORBIDDEN, "Forbidden");
            };

            let (submitted, request) = match self.header_token(&request) {
                Some(token) => (Some(token), request),
                None if is_form(&request) => {
                    let (parts, body) = request.into_parts();
                    let bytes: Bytes = match body.collect().await {
                        Ok(collected) => collected.to_bytes(),
                        Err(never) => match never {},
                    };
                    let token = self.form_token(&bytes);
                    (token, Request::from_parts(parts, Full::new(bytes)))
                }
                None => (None, request),
            };

            match submitted {
                Some(token) if tokens_match(&expected, &token) => next.run(ctx, request).await,
                _ => {
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        method = %request.method(),
                        path = %request.uri().path(),
                        "csrf token mismatch"
                    );
                    Response::error(StatusCode::FORBIDDEN, "Forbidden")
                }
            }
        })
    }
}

/// Returns 32 random bytes, base64 encoded.
#[must_use]
pub fn generate_csrf_token() -> String {
    let mut bytes = [0_u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Generates a token, sets it as the `csrf_token` cookie on `response` and
/// returns it so the handler can embed it in a form or page.
pub fn issue_csrf_token(response: &mut Response) -> String {
    let token = generate_csrf_token();
    let cookie = format!("{DEFAULT_COOKIE_NAME}={token}; Path=/");
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_handler<'a>() -> Next<'a> {
        Next::handler(|_ctx, _req| Box::pin(async { Response::text(StatusCode::OK, "OK") }))
    }

    fn post(cookie: Option<&str>) -> http::request::Builder {
        let mut builder = http::Request::builder().method(Method::POST).uri("/submit");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    async fn status(request: Request) -> StatusCode {
        let mut ctx = RequestContext::new();
        CsrfMiddleware::new()
            .process(&mut ctx, request, ok_handler())
            .await
            .status()
    }

    #[tokio::test]
    async fn test_safe_method_passes() {
        let request = http::Request::builder()
            .uri("/form")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(status(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_header_token_accepted() {
        let request = post(Some("session=1; csrf_token=abc123"))
            .header("X-CSRF-Token", "abc123")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(status(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_form_token_accepted_and_body_preserved() {
        let request = post(Some("csrf_token=t%2B1"))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from("name=a&csrf_token=t%252B1")))
            .unwrap();

        let mut ctx = RequestContext::new();
        let next = Next::handler(|_ctx, req: Request| -> BoxFuture<'static, Response> {
            Box::pin(async move {
                let body = req.into_body().collect().await.unwrap().to_bytes();
                Response::text(StatusCode::OK, String::from_utf8_lossy(&body).into_owned())
            })
        });
        let response = CsrfMiddleware::new().process(&mut ctx, request, next).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "name=a&csrf_token=t%252B1");
    }

    #[tokio::test]
    async fn test_mismatch_rejected() {
        let request = post(Some("csrf_token=abc"))
            .header("X-CSRF-Token", "abd")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(status(request).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_or_empty_cookie_rejected() {
        let no_cookie = post(None)
            .header("X-CSRF-Token", "abc")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(status(no_cookie).await, StatusCode::FORBIDDEN);

        let empty_cookie = post(Some("csrf_token="))
            .header("X-CSRF-Token", "")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(status(empty_cookie).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_rejection_body() {
        let request = post(Some("csrf_token=abc")).body(Full::new(Bytes::new())).unwrap();
        let mut ctx = RequestContext::new();
        let response = CsrfMiddleware::new()
            .process(&mut ctx, request, ok_handler())
            .await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "Forbidden\n");
    }

    #[test]
    fn test_issue_token_sets_cookie() {
        let mut response = Response::text(StatusCode::OK, "form");
        let token = issue_csrf_token(&mut response);

        assert_eq!(STANDARD.decode(&token).unwrap().len(), TOKEN_BYTES);
        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert_eq!(cookie.to_str().unwrap(), format!("csrf_token={token}; Path=/"));
        assert_ne!(generate_csrf_token(), token);
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("abc", "abcd"));
    }
}
