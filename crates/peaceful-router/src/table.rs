//! Ordered route table.
//!
//! Routes are kept in registration order and matched linearly; the first
//! route whose method and compiled pattern both accept the request wins.
//! Nothing stops two routes from overlapping, so registration order is the
//! priority order.

use std::sync::Arc;

use http::Method;

use crate::error::RouterResult;
use crate::pattern::CompiledPattern;
use crate::registry::TypeRegistry;
use crate::RouteMatch;

/// A registered route carrying an endpoint payload `T`.
#[derive(Debug, Clone)]
pub struct Route<T> {
    method: Method,
    raw_path: String,
    pattern: CompiledPattern,
    endpoint: T,
}

impl<T> Route<T> {
    /// Returns the method this route answers.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the template the route was registered with.
    #[must_use]
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// Returns the compiled pattern.
    #[must_use]
    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    /// Returns the parameter names in declaration order.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        self.pattern.param_names()
    }

    /// Returns the endpoint payload.
    #[must_use]
    pub fn endpoint(&self) -> &T {
        &self.endpoint
    }
}

/// Routes in registration order, generic over the endpoint payload.
///
/// # Example
///
/// ```rust
/// use peaceful_router::RouteTable;
/// use http::Method;
///
/// let mut table = RouteTable::new();
/// table.insert(Method::GET, "/users/me", "currentUser").unwrap();
/// table.insert(Method::GET, "/users/{id}", "getUser").unwrap();
///
/// let m = table.match_route(&Method::GET, "/users/me").unwrap();
/// assert_eq!(*m.endpoint(), "currentUser");
///
/// let m = table.match_route(&Method::GET, "/users/7").unwrap();
/// assert_eq!(*m.endpoint(), "getUser");
/// assert_eq!(m.params.get("id"), Some("7"));
///
/// assert!(table.match_route(&Method::POST, "/users/7").is_none());
/// ```
#[derive(Debug)]
pub struct RouteTable<T> {
    registry: Arc<TypeRegistry>,
    routes: Vec<Route<T>>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTable<T> {
    /// Creates an empty table with its own type registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(Arc::new(TypeRegistry::new()))
    }

    /// Creates an empty table that resolves types through `registry`.
    #[must_use]
    pub fn with_registry(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            routes: Vec::new(),
        }
    }

    /// Returns the type registry used to compile templates.
    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Compiles `path` and appends a route.
    ///
    /// Custom types must be registered before the routes that use them;
    /// templates are compiled here, once.
    pub fn insert(&mut self, method: Method, path: &str, endpoint: T) -> RouterResult<&Route<T>> {
        let pattern = CompiledPattern::compile(path, &self.registry)?;
        tracing::debug!(
            method = %method,
            path = %path,
            params = ?pattern.param_names(),
            "route registered"
        );

        let index = self.routes.len();
        self.routes.push(Route {
            method,
            raw_path: path.to_string(),
            pattern,
            endpoint,
        });
        Ok(&self.routes[index])
    }

    /// Finds the first route matching `method` and `path`.
    ///
    /// `path` is compared as-is; it is not percent-decoded or normalised.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                route
                    .pattern
                    .captures(path)
                    .map(|params| RouteMatch::new(route, params))
            })
    }

    /// Returns the registered routes in priority order.
    #[must_use]
    pub fn routes(&self) -> &[Route<T>] {
        &self.routes
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/items/{id}", "generic").unwrap();
        table.insert(Method::GET, "/items/{id:int}", "typed").unwrap();

        let m = table.match_route(&Method::GET, "/items/5").unwrap();
        assert_eq!(*m.endpoint(), "generic");
    }

    #[test]
    fn test_method_must_match_exactly() {
        let mut table = RouteTable::new();
        table.insert(Method::POST, "/items", "create").unwrap();

        assert!(table.match_route(&Method::GET, "/items").is_none());
        assert!(table.match_route(&Method::POST, "/items").is_some());
    }

    #[test]
    fn test_same_template_different_methods() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/items/{id}", "get").unwrap();
        table.insert(Method::DELETE, "/items/{id}", "delete").unwrap();

        assert_eq!(
            *table.match_route(&Method::DELETE, "/items/1").unwrap().endpoint(),
            "delete"
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_insert_returns_route() {
        let mut table = RouteTable::new();
        let route = table
            .insert(Method::PUT, "/users/{id:uuid}/name", 7_u32)
            .unwrap();
        assert_eq!(*route.method(), Method::PUT);
        assert_eq!(route.raw_path(), "/users/{id:uuid}/name");
        assert_eq!(route.param_names(), ["id"]);
        assert_eq!(*route.endpoint(), 7);
    }

    #[test]
    fn test_shared_registry() {
        let registry = Arc::new(TypeRegistry::new());
        registry.register("lang", "(en|fr|de)").unwrap();

        let mut table = RouteTable::with_registry(Arc::clone(&registry));
        table.insert(Method::GET, "/docs/{lang:lang}", ()).unwrap();

        assert!(table.match_route(&Method::GET, "/docs/fr").is_some());
        assert!(table.match_route(&Method::GET, "/docs/es").is_none());
        assert!(Arc::ptr_eq(table.registry(), &registry));
    }

    #[test]
    fn test_empty_table() {
        let table: RouteTable<()> = RouteTable::default();
        assert!(table.is_empty());
        assert!(table.match_route(&Method::GET, "/").is_none());
    }
}
