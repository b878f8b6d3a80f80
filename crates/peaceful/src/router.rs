//! The dispatcher.
//!
//! A [`Router`] owns the route table, the global middleware chain and the
//! route groups. Registration takes `&mut self`; dispatching takes `&self`,
//! so a fully built router is shared as `Arc<Router>` across tasks.
//!
//! For every request the effective chain is
//!
//! ```text
//! global (registration order) → group (registration order) → route → handler
//! ```
//!
//! and requests that match no route get the not-found handler wrapped in the
//! global chain only.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use peaceful_config::PeacefulConfig;
use peaceful_core::RequestContext;
use peaceful_middleware::{
    compose, handler_fn, BoxedHandler, BoxedMiddleware, Chain, Middleware, Request, Response,
    ResponseExt,
};
use peaceful_router::{RouteTable, RouterResult, TypeRegistry};
use peaceful_telemetry::metrics;

use crate::stack;

/// Path prefix shared by all route groups.
pub const GROUP_PREFIX: &str = "/api";

struct Endpoint {
    handler: BoxedHandler,
    middleware: Vec<BoxedMiddleware>,
    group: Option<usize>,
}

#[derive(Debug)]
struct Group {
    key: String,
    prefix: String,
    middleware: Chain,
}

/// Matches requests to handlers and runs them through middleware.
///
/// # Example
///
/// ```
/// use peaceful::{handler_fn, Response, ResponseExt, Router};
/// use http::StatusCode;
///
/// # tokio_test::block_on(async {
/// let mut router = Router::new();
/// router
///     .get("/users/{id:int}", handler_fn(|ctx, _req| async move {
///         Response::text(StatusCode::OK, format!("user {}", ctx.param("id")))
///     }))
///     .unwrap();
///
/// let request = http::Request::get("/users/42").body(Default::default()).unwrap();
/// let response = router.dispatch(request).await;
/// assert_eq!(response.status(), StatusCode::OK);
///
/// let request = http::Request::get("/users/abc").body(Default::default()).unwrap();
/// assert_eq!(router.dispatch(request).await.status(), StatusCode::NOT_FOUND);
/// # });
/// ```
pub struct Router {
    table: RouteTable<Endpoint>,
    global: Chain,
    groups: Vec<Group>,
    group_keys: HashMap<String, usize>,
    not_found: BoxedHandler,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.table.len())
            .field("global", &self.global)
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Creates an empty router with its own type registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(Arc::new(TypeRegistry::new()))
    }

    /// Creates an empty router that resolves parameter types through
    /// `registry`.
    #[must_use]
    pub fn with_registry(registry: Arc<TypeRegistry>) -> Self {
        Self {
            table: RouteTable::with_registry(registry),
            global: Chain::new(),
            groups: Vec::new(),
            group_keys: HashMap::new(),
            not_found: handler_fn(|_ctx, _req| async { Response::not_found() }),
        }
    }

    /// Creates a router whose global chain is built from `config`.
    ///
    /// The config is expected to be validated already, as
    /// [`ConfigLoader::load`](peaceful_config::ConfigLoader::load) does.
    #[must_use]
    pub fn with_config(config: &PeacefulConfig) -> Self {
        let mut router = Self::new();
        router.global = stack::global_chain(config);
        router
    }

    /// Returns the type registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        self.table.registry()
    }

    /// Registers a custom parameter type for routes added afterwards.
    ///
    /// # Errors
    ///
    /// Returns `RouterError::DuplicateTag` if the tag is built in or taken,
    /// `RouterError::InvalidPattern` if `expr` does not compile, and
    /// `RouterError::NamedCapture` if `expr` declares a named group.
    pub fn register_param_type(&self, tag: &str, expr: &str) -> RouterResult<()> {
        self.table.registry().register(tag, expr)
    }

    /// Appends a global middleware. It runs inside every global middleware
    /// added before it.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.global.push(middleware);
        self
    }

    /// Replaces the handler answering requests that match no route.
    pub fn set_not_found(&mut self, handler: BoxedHandler) -> &mut Self {
        self.not_found = handler;
        self
    }

    /// Registers a route with its own middleware.
    ///
    /// Routes are tried in registration order; the first match wins.
    ///
    /// # Errors
    ///
    /// Returns `RouterError::InvalidPattern` if the template does not compile.
    pub fn add_route(
        &mut self,
        method: Method,
        path: &str,
        handler: BoxedHandler,
        middleware: Vec<BoxedMiddleware>,
    ) -> RouterResult<&mut Self> {
        self.insert(None, method, path, handler, middleware)?;
        Ok(self)
    }

    /// Registers a `GET` route.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn get(&mut self, path: &str, handler: BoxedHandler) -> RouterResult<&mut Self> {
        self.add_route(Method::GET, path, handler, Vec::new())
    }

    /// Registers a `POST` route.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn post(&mut self, path: &str, handler: BoxedHandler) -> RouterResult<&mut Self> {
        self.add_route(Method::POST, path, handler, Vec::new())
    }

    /// Registers a `PUT` route.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn put(&mut self, path: &str, handler: BoxedHandler) -> RouterResult<&mut Self> {
        self.add_route(Method::PUT, path, handler, Vec::new())
    }

    /// Registers a `DELETE` route.
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn delete(&mut self, path: &str, handler: BoxedHandler) -> RouterResult<&mut Self> {
        self.add_route(Method::DELETE, path, handler, Vec::new())
    }

    /// Returns the group for `key`, creating it on first use.
    ///
    /// Routes added through the group live under `/api/{key}`. Calling this
    /// again with the same key returns the same group.
    pub fn group(&mut self, key: &str) -> RouteGroup<'_> {
        let index = match self.group_keys.get(key) {
            Some(&index) => index,
            None => {
                let index = self.groups.len();
                self.groups.push(Group {
                    key: key.to_string(),
                    prefix: format!("{GROUP_PREFIX}/{key}"),
                    middleware: Chain::new(),
                });
                self.group_keys.insert(key.to_string(), index);
                tracing::debug!(group = %key, "route group created");
                index
            }
        };
        RouteGroup {
            router: self,
            index,
        }
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.table.len()
    }

    /// Returns the registered `(method, template)` pairs in priority order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.table
            .routes()
            .iter()
            .map(|route| (route.method(), route.raw_path()))
    }

    /// Dispatches a request with a fresh context.
    pub async fn dispatch(&self, request: Request) -> Response {
        self.dispatch_with(RequestContext::new(), request).await
    }

    /// Dispatches a request with a context prepared by the host, e.g. one
    /// carrying the peer address.
    pub async fn dispatch_with(&self, mut ctx: RequestContext, request: Request) -> Response {
        let matched = self
            .table
            .match_route(request.method(), request.uri().path());

        let Some(matched) = matched else {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                "no route matched"
            );
            metrics::record_not_found(request.method().as_str());
            return compose(&self.global, Arc::clone(&self.not_found))
                .run(&mut ctx, request)
                .await;
        };

        let endpoint = matched.route.endpoint();
        ctx.set_params(matched.params);

        let group = endpoint.group.map(|index| &self.groups[index].middleware);
        let layers = self
            .global
            .iter()
            .chain(group.into_iter().flat_map(Chain::iter))
            .chain(endpoint.middleware.iter());

        compose(layers, Arc::clone(&endpoint.handler))
            .run(&mut ctx, request)
            .await
    }

    fn insert(
        &mut self,
        group: Option<usize>,
        method: Method,
        path: &str,
        handler: BoxedHandler,
        middleware: Vec<BoxedMiddleware>,
    ) -> RouterResult<()> {
        let endpoint = Endpoint {
            handler,
            middleware,
            group,
        };
        self.table.insert(method, path, endpoint)?;
        Ok(())
    }
}

/// Routes sharing the `/api/{key}` prefix and a middleware list.
///
/// Group middleware runs after the global chain and before any route
/// middleware. It applies to every route of the group, including routes
/// registered before the middleware was added.
///
/// # Example
///
/// ```
/// use peaceful::{handler_fn, Response, ResponseExt, Router};
/// use http::StatusCode;
///
/// let mut router = Router::new();
/// router
///     .group("v1")
///     .get("/items", handler_fn(|_ctx, _req| async { Response::text(StatusCode::OK, "[]") }))
///     .unwrap();
///
/// let routes: Vec<_> = router.routes().map(|(_, path)| path.to_string()).collect();
/// assert_eq!(routes, ["/api/v1/items"]);
/// ```
pub struct RouteGroup<'r> {
    router: &'r mut Router,
    index: usize,
}

impl std::fmt::Debug for RouteGroup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGroup")
            .field("key", &self.key())
            .field("prefix", &self.prefix())
            .finish()
    }
}

impl RouteGroup<'_> {
    /// Returns the group key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.router.groups[self.index].key
    }

    /// Returns the path prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.router.groups[self.index].prefix
    }

    /// Appends a middleware to the group.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.router.groups[self.index].middleware.push(middleware);
        self
    }

    /// Registers a route under the group prefix.
    ///
    /// # Errors
    ///
    /// Returns `RouterError::InvalidPattern` if the template does not compile.
    pub fn add_route(
        &mut self,
        method: Method,
        path: &str,
        handler: BoxedHandler,
        middleware: Vec<BoxedMiddleware>,
    ) -> RouterResult<&mut Self> {
        let full_path = format!("{}{path}", self.prefix());
        self.router
            .insert(Some(self.index), method, &full_path, handler, middleware)?;
        Ok(self)
    }

    /// Registers a `GET` route.
    ///
    /// # Errors
    ///
    /// See [`RouteGroup::add_route`].
    pub fn get(&mut self, path: &str, handler: BoxedHandler) -> RouterResult<&mut Self> {
        self.add_route(Method::GET, path, handler, Vec::new())
    }

    /// Registers a `POST` route.
    ///
    /// # Errors
    ///
    /// See [`RouteGroup::add_route`].
    pub fn post(&mut self, path: &str, handler: BoxedHandler) -> RouterResult<&mut Self> {
        self.add_route(Method::POST, path, handler, Vec::new())
    }

    /// Registers a `PUT` route.
    ///
    /// # Errors
    ///
    /// See [`RouteGroup::add_route`].
    pub fn put(&mut self, path: &str, handler: BoxedHandler) -> RouterResult<&mut Self> {
        self.add_route(Method::PUT, path, handler, Vec::new())
    }

    /// Registers a `DELETE` route.
    ///
    /// # Errors
    ///
    /// See [`RouteGroup::add_route`].
    pub fn delete(&mut self, path: &str, handler: BoxedHandler) -> RouterResult<&mut Self> {
        self.add_route(Method::DELETE, path, handler, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn ok() -> BoxedHandler {
        handler_fn(|_ctx, _req| async { Response::text(StatusCode::OK, "OK") })
    }

    #[test]
    fn test_group_is_idempotent() {
        let mut router = Router::new();
        router.group("v1").get("/a", ok()).unwrap();
        router.group("v1").get("/b", ok()).unwrap();
        router.group("v2").get("/a", ok()).unwrap();

        assert_eq!(router.groups.len(), 2);
        let paths: Vec<_> = router.routes().map(|(_, p)| p).collect();
        assert_eq!(paths, ["/api/v1/a", "/api/v1/b", "/api/v2/a"]);
    }

    #[test]
    fn test_group_accessors() {
        let mut router = Router::new();
        let group = router.group("beta");
        assert_eq!(group.key(), "beta");
        assert_eq!(group.prefix(), "/api/beta");
    }

    #[test]
    fn test_invalid_custom_type_is_rejected() {
        let router = Router::new();
        assert!(router.register_param_type("bad", "(").is_err());
        assert!(router.register_param_type("int", "[0-9]+").is_err());
        assert!(router.register_param_type("hex", "[0-9a-f]+").is_ok());
    }

    #[test]
    fn test_router_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Router>();
    }

    #[tokio::test]
    async fn test_dispatch_future_is_send() {
        let router = Arc::new(Router::new());
        let handle = tokio::spawn({
            let router = Arc::clone(&router);
            async move {
                router
                    .dispatch(http::Request::new(Default::default()))
                    .await
                    .status()
            }
        });
        assert_eq!(handle.await.unwrap(), StatusCode::NOT_FOUND);
    }
}
