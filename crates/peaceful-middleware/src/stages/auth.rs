//! Bearer token authentication.
//!
//! Reads the `Authorization` header, strips an optional `Bearer ` prefix (in
//! any letter case) and hands the token to a [`TokenValidator`]. On success
//! the returned [`Principal`] is stored in the request context; otherwise the
//! chain stops with `401 Unauthorized`.
//!
//! Token issuance and the meaning of a token are left to the validator.
//!
//! # Example
//!
//! ```
//! use peaceful_core::Principal;
//! use peaceful_middleware::stages::{AuthError, AuthMiddleware};
//!
//! let auth = AuthMiddleware::new(|token: &str| {
//!     token
//!         .strip_prefix("user-")
//!         .map(Principal::new)
//!         .ok_or(AuthError::InvalidToken)
//! });
//! # let _ = auth;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use http::{header, HeaderValue, StatusCode};
use peaceful_core::{Principal, RequestContext};

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};

/// Body of the 401 sent when no credentials are present.
pub const MISSING_CREDENTIALS: &str = "Authorization header must be provided";

/// Body of the 401 sent when the validator rejects the token.
pub const INVALID_CREDENTIALS: &str = "Invalid or expired token";

const BEARER_PREFIX: &str = "Bearer ";

/// Reasons a token is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The token is malformed or unknown.
    #[error("invalid token")]
    InvalidToken,

    /// The token was valid once but no longer is.
    #[error("token expired")]
    Expired,

    /// The validator failed for another reason.
    #[error("token rejected: {0}")]
    Rejected(String),
}

/// Turns a bearer token into a principal.
pub trait TokenValidator: Send + Sync + 'static {
    /// Validates `token`.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if the token is not acceptable.
    fn validate(&self, token: &str) -> Result<Principal, AuthError>;
}

impl<F> TokenValidator for F
where
    F: Fn(&str) -> Result<Principal, AuthError> + Send + Sync + 'static,
{
    fn validate(&self, token: &str) -> Result<Principal, AuthError> {
        self(token)
    }
}

/// A fixed table of tokens and the principals they stand for.
///
/// Handy for tests and internal tooling.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, Principal>,
}

impl StaticTokenValidator {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }
}

impl TokenValidator for StaticTokenValidator {
    fn validate(&self, token: &str) -> Result<Principal, AuthError> {
        self.tokens.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}

/// Middleware requiring a valid bearer token.
#[derive(Clone)]
pub struct AuthMiddleware {
    validator: Arc<dyn TokenValidator>,
}

impl std::fmt::Debug for AuthMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthMiddleware").finish_non_exhaustive()
    }
}

impl AuthMiddleware {
    /// Creates the middleware around a validator.
    pub fn new(validator: impl TokenValidator) -> Self {
        Self {
            validator: Arc::new(validator),
        }
    }

    /// Creates the middleware around a shared validator.
    #[must_use]
    pub fn from_arc(validator: Arc<dyn TokenValidator>) -> Self {
        Self { validator }
    }

    fn token(request: &Request) -> Option<&str> {
        let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = match value.get(..BEARER_PREFIX.len()) {
            Some(scheme) if scheme.eq_ignore_ascii_case(BEARER_PREFIX) => {
                &value[BEARER_PREFIX.len()..]
            }
            _ => value,
        }
        .trim();
        (!token.is_empty()).then_some(token)
    }

    fn unauthorized(message: &str) -> Response {
        let mut response = Response::error(StatusCode::UNAUTHORIZED, message);
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response
    }
}

impl Middleware for AuthMiddleware {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let Some(token) = Self::token(&request) else {
                tracing::debug!(request_id = %ctx.request_id(), "authorization header missing");
                return Self::unauthorized(MISSING_CREDENTIALS);
            };

            match self.validator.validate(token) {
                Ok(principal) => {
                    tracing::debug!(request_id = %ctx.request_id(), subject = %principal, "authenticated");
                    ctx.set_principal(principal);
                    next.run(ctx, request).await
                }
                Err(err) => {
                    tracing::warn!(request_id = %ctx.request_id(), error = %err, "token rejected");
                    Self::unauthorized(INVALID_CREDENTIALS)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};

    fn validator() -> StaticTokenValidator {
        StaticTokenValidator::new().with_token("s3cret", Principal::new("alice").with_role("admin"))
    }

    fn request(authorization: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/private");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    fn echo_principal<'a>() -> Next<'a> {
        Next::handler(|ctx, _req| {
            let subject = ctx.principal().map(|p| p.subject().to_string()).unwrap_or_default();
            Box::pin(async move { Response::text(StatusCode::OK, subject) })
        })
    }

    async fn body(response: Response) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_missing_header() {
        let auth = AuthMiddleware::new(validator());
        let mut ctx = RequestContext::new();
        let response = auth.process(&mut ctx, request(None), echo_principal()).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
        assert_eq!(body(response).await, "Authorization header must be provided\n");
        assert!(ctx.principal().is_none());
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let auth = AuthMiddleware::new(validator());
        let mut ctx = RequestContext::new();
        let response = auth
            .process(&mut ctx, request(Some("Bearer nope")), echo_principal())
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(response).await, "Invalid or expired token\n");
    }

    #[tokio::test]
    async fn test_valid_token_with_and_without_prefix() {
        let auth = AuthMiddleware::new(validator());

        for header in ["Bearer s3cret", "bearer s3cret", "BEARER  s3cret", "s3cret"] {
            let mut ctx = RequestContext::new();
            let response = auth
                .process(&mut ctx, request(Some(header)), echo_principal())
                .await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body(response).await, "alice");
            assert!(ctx.principal().unwrap().has_role("admin"));
        }
    }

    #[tokio::test]
    async fn test_closure_validator() {
        let auth = AuthMiddleware::new(|token: &str| {
            if token == "expired" {
                Err(AuthError::Expired)
            } else {
                Ok(Principal::new(token))
            }
        });

        let mut ctx = RequestContext::new();
        let response = auth
            .process(&mut ctx, request(Some("Bearer expired")), echo_principal())
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut ctx = RequestContext::new();
        let response = auth
            .process(&mut ctx, request(Some("Bearer bob")), echo_principal())
            .await;
        assert_eq!(body(response).await, "bob");
    }
}
