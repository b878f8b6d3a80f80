//! Cross-origin resource sharing.
//!
//! Preflight requests (`OPTIONS` carrying both `Origin` and
//! `Access-Control-Request-Method`) are answered here with `204 No Content`
//! and never reach the handler. A preflight for an origin, method or header
//! outside the policy is refused with `403 Forbidden`.
//!
//! Every other request continues downstream; when it carries an allowed
//! `Origin`, the response is decorated with the allow-origin, credentials
//! and expose headers on the way back.
//!
//! # Example
//!
//! ```
//! use peaceful_middleware::stages::CorsMiddleware;
//! use http::Method;
//! use std::time::Duration;
//!
//! let cors = CorsMiddleware::builder()
//!     .allow_origin("https://app.example.com")
//!     .allow_methods([Method::GET, Method::POST])
//!     .allow_headers(["Content-Type", "X-CSRF-Token"])
//!     .allow_credentials(true)
//!     .max_age(Duration::from_secs(600))
//!     .build();
//!
//! assert!(cors.config().is_origin_allowed("https://app.example.com"));
//! assert!(!cors.config().is_origin_allowed("https://evil.example.com"));
//! ```

use std::collections::HashSet;
use std::time::Duration;

use http::{header, HeaderValue, Method, StatusCode};
use peaceful_core::RequestContext;

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};

const PREFLIGHT_VARY: &str = "Origin, Access-Control-Request-Method, Access-Control-Request-Headers";

/// Origins a policy accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Any origin; answered with `*`.
    Any,
    /// Exactly these origins; answered by echoing the request origin.
    List(HashSet<String>),
}

impl AllowedOrigins {
    /// Returns true if `origin` is accepted.
    #[must_use]
    pub fn is_allowed(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::List(origins) => origins.contains(origin),
        }
    }

    fn header_value(&self, origin: &str) -> Option<HeaderValue> {
        match self {
            Self::Any => Some(HeaderValue::from_static("*")),
            Self::List(origins) if origins.contains(origin) => HeaderValue::from_str(origin).ok(),
            Self::List(_) => None,
        }
    }
}

/// A CORS policy.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    allowed_origins: AllowedOrigins,
    // Vecs keep header output in insertion order.
    allowed_methods: Vec<Method>,
    allowed_headers: Vec<String>,
    expose_headers: Vec<String>,
    allow_credentials: bool,
    max_age: Option<Duration>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: AllowedOrigins::List(HashSet::new()),
            allowed_methods: vec![
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
            ],
            allowed_headers: vec![
                "content-type".to_string(),
                "authorization".to_string(),
                "x-request-id".to_string(),
            ],
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age: Some(Duration::from_secs(86_400)),
        }
    }
}

impl CorsConfig {
    /// Returns true if `origin` is accepted.
    #[must_use]
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.is_allowed(origin)
    }

    /// Returns the accepted origins.
    #[must_use]
    pub fn allowed_origins(&self) -> &AllowedOrigins {
        &self.allowed_origins
    }

    /// Returns the accepted methods.
    #[must_use]
    pub fn allowed_methods(&self) -> &[Method] {
        &self.allowed_methods
    }

    /// Returns the accepted request headers, lowercased.
    #[must_use]
    pub fn allowed_headers(&self) -> &[String] {
        &self.allowed_headers
    }

    /// Returns whether credentials are allowed.
    #[must_use]
    pub fn allow_credentials(&self) -> bool {
        self.allow_credentials
    }

    fn allows_header(&self, name: &str) -> bool {
        self.allowed_headers.iter().any(|h| h == "*" || h == name)
    }
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

fn lowercase_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut list = Vec::new();
    for item in items {
        push_unique(&mut list, item.into().to_ascii_lowercase());
    }
    list
}

/// Builder for [`CorsMiddleware`].
#[derive(Debug, Clone, Default)]
pub struct CorsBuilder {
    config: CorsConfig,
}

impl CorsBuilder {
    /// Starts from the default policy: no origins, common methods and headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts any origin.
    ///
    /// Browsers refuse `*` together with credentials; pair this with
    /// `allow_credentials(false)`.
    #[must_use]
    pub fn allow_any_origin(mut self) -> Self {
        self.config.allowed_origins = AllowedOrigins::Any;
        self
    }

    /// Accepts one more origin. Has no effect after `allow_any_origin`.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        if let AllowedOrigins::List(origins) = &mut self.config.allowed_origins {
            origins.insert(origin.into());
        }
        self
    }

    /// Replaces the accepted origins. A `"*"` entry means any origin.
    #[must_use]
    pub fn allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origins: HashSet<String> = origins.into_iter().map(Into::into).collect();
        self.config.allowed_origins = if origins.contains("*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        };
        self
    }

    /// Replaces the accepted methods.
    #[must_use]
    pub fn allow_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        let mut list = Vec::new();
        for method in methods {
            push_unique(&mut list, method);
        }
        self.config.allowed_methods = list;
        self
    }

    /// Replaces the accepted request headers. `"*"` accepts any header.
    #[must_use]
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_headers = lowercase_list(headers);
        self
    }

    /// Sets the response headers scripts may read.
    #[must_use]
    pub fn expose_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.expose_headers = lowercase_list(headers);
        self
    }

    /// Sets whether cookies and authorization headers may be sent.
    #[must_use]
    pub const fn allow_credentials(mut self, allow: bool) -> Self {
        self.config.allow_credentials = allow;
        self
    }

    /// Sets how long browsers may cache a preflight answer.
    #[must_use]
    pub const fn max_age(mut self, duration: Duration) -> Self {
        self.config.max_age = Some(duration);
        self
    }

    /// Omits `Access-Control-Max-Age`.
    #[must_use]
    pub const fn no_max_age(mut self) -> Self {
        self.config.max_age = None;
        self
    }

    /// Builds the middleware.
    #[must_use]
    pub fn build(self) -> CorsMiddleware {
        CorsMiddleware {
            config: self.config,
        }
    }
}

/// Middleware applying a [`CorsConfig`].
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    config: CorsConfig,
}

impl CorsMiddleware {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> CorsBuilder {
        CorsBuilder::new()
    }

    /// Accepts any origin, method and header. Meant for local development.
    #[must_use]
    pub fn permissive() -> Self {
        CorsBuilder::new()
            .allow_any_origin()
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
                Method::OPTIONS,
            ])
            .allow_headers(["*"])
            .build()
    }

    /// Returns the policy.
    #[must_use]
    pub fn config(&self) -> &CorsConfig {
        &self.config
    }

    fn is_preflight(request: &Request) -> bool {
        request.method() == Method::OPTIONS
            && request.headers().contains_key(header::ORIGIN)
            && request
                .headers()
                .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
    }

    fn origin(request: &Request) -> Option<&str> {
        request
            .headers()
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
    }

    /// Returns the reason a preflight is refused, if it is.
    fn check_preflight(&self, request: &Request, origin: &str) -> Option<&'static str> {
        if !self.config.allowed_origins.is_allowed(origin) {
            return Some("origin not allowed");
        }

        let requested = request
            .headers()
            .get(header::ACCESS_CONTROL_REQUEST_METHOD)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Method>().ok());
        match requested {
            Some(method) if self.config.allowed_methods.contains(&method) => {}
            _ => return Some("method not allowed"),
        }

        let requested_headers = request
            .headers()
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let all_allowed = requested_headers
            .split(',')
            .map(|h| h.trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .all(|h| self.config.allows_header(&h));
        if !all_allowed {
            return Some("header not allowed");
        }

        None
    }

    fn preflight_response(&self, origin: &str) -> Response {
        let mut builder = http::Response::builder().status(StatusCode::NO_CONTENT);

        if let Some(value) = self.config.allowed_origins.header_value(origin) {
            builder = builder.header(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        if !self.config.allowed_methods.is_empty() {
            let methods: Vec<&str> = self.config.allowed_methods.iter().map(Method::as_str).collect();
            builder = builder.header(header::ACCESS_CONTROL_ALLOW_METHODS, methods.join(", "));
        }
        if !self.config.allowed_headers.is_empty() {
            builder = builder.header(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                self.config.allowed_headers.join(", "),
            );
        }
        if self.config.allow_credentials {
            builder = builder.header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
        }
        if let Some(max_age) = self.config.max_age {
            builder = builder.header(header::ACCESS_CONTROL_MAX_AGE, max_age.as_secs().to_string());
        }

        builder
            .header(header::VARY, PREFLIGHT_VARY)
            .body(http_body_util::Full::default())
            .expect("preflight response parts are valid")
    }

    fn decorate(&self, response: &mut Response, origin: &str) {
        let Some(allow_origin) = self.config.allowed_origins.header_value(origin) else {
            return;
        };
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);

        if self.config.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if !self.config.expose_headers.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&self.config.expose_headers.join(", ")) {
                headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, value);
            }
        }
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if Self::is_preflight(&request) {
                let origin = Self::origin(&request).unwrap_or_default();
                return match self.check_preflight(&request, origin) {
                    None => self.preflight_response(origin),
                    Some(reason) => {
                        tracing::debug!(origin = %origin, reason, "preflight refused");
                        Response::error(StatusCode::FORBIDDEN, "Forbidden")
                    }
                };
            }

            let origin = Self::origin(&request).map(str::to_owned);
            let mut response = next.run(ctx, request).await;
            if let Some(origin) = origin {
                self.decorate(&mut response, &origin);
            }
            response
        })
    }
}
