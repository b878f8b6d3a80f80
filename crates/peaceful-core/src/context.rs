//! Request context types.
//!
//! The [`RequestContext`] carries per-request state through the middleware
//! chain and into the terminal handler. It is owned by a single in-flight
//! request and never shared between requests.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::{Duration, Instant};

use peaceful_router::Params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::media::MediaType;
use crate::principal::Principal;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps request IDs sortable in logs.
///
/// # Example
///
/// ```
/// use peaceful_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Per-request state seen by middleware and handlers.
///
/// # Example
///
/// ```
/// use peaceful_core::{Params, RequestContext};
///
/// let mut params = Params::new();
/// params.insert("id", "42");
///
/// let ctx = RequestContext::new().with_params(params);
/// assert_eq!(ctx.param("id"), "42");
/// assert_eq!(ctx.param_as::<u32>("id"), Some(42));
/// assert_eq!(ctx.param("missing"), "");
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request.
    request_id: RequestId,

    /// Path parameters bound by the matched route.
    params: Params,

    /// Representation negotiated from `Accept`.
    media_type: MediaType,

    /// Subject accepted by an authentication stage.
    principal: Option<Principal>,

    /// Peer address, when the host supplies one.
    remote_addr: Option<SocketAddr>,

    /// When the request entered the dispatcher.
    started_at: Instant,
}

impl RequestContext {
    /// Creates a new context with a fresh request ID and no parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a new context with the specified request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            params: Params::new(),
            media_type: MediaType::default(),
            principal: None,
            remote_addr: None,
            started_at: Instant::now(),
        }
    }

    /// Sets the bound path parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Sets the peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Replaces the request ID.
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = request_id;
    }

    /// Returns the value bound to `name`, or an empty string when the
    /// matched route declared no such parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).unwrap_or("")
    }

    /// Parses the value bound to `name`.
    ///
    /// Returns `None` when the parameter is unbound or does not parse.
    #[must_use]
    pub fn param_as<T: FromStr>(&self, name: &str) -> Option<T> {
        self.params.get(name).and_then(|v| v.parse().ok())
    }

    /// Returns all bound parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Replaces the bound parameters.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// Returns the negotiated media type.
    #[must_use]
    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Records the negotiated media type.
    pub fn set_media_type(&mut self, media_type: MediaType) {
        self.media_type = media_type;
    }

    /// Returns the authenticated principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Records the authenticated principal.
    pub fn set_principal(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    /// Returns the peer address, if the host supplied one.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Records the peer address.
    pub fn set_remote_addr(&mut self, addr: SocketAddr) {
        self.remote_addr = Some(addr);
    }

    /// Returns when the request entered the dispatcher.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the time elapsed since the request entered the dispatcher.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
