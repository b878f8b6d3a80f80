//! Typed path matching for Peaceful.
//!
//! This crate turns route templates such as `/users/{id:int}/posts/{slug:slug}`
//! into anchored matchers and keeps them in an ordered table.
//!
//! # Features
//!
//! - **Typed Placeholders**: `{name:type}` restricts a parameter to a shape
//!   (`int`, `float`, `uuid`, `alphanumeric`, `string`, `slug`, `email`,
//!   `date`, `ipv4`, `ipv6`)
//! - **Custom Types**: register new tags in a shared [`TypeRegistry`]
//! - **Positional Binding**: the Nth parameter is always the Nth placeholder
//! - **First Match Wins**: routes are tried in registration order
//!
//! # Example
//!
//! ```rust
//! use peaceful_router::RouteTable;
//! use http::Method;
//!
//! let mut table = RouteTable::new();
//! table.registry().register("hex", "[0-9a-f]+").unwrap();
//!
//! table.insert(Method::GET, "/users/{id:int}/posts/{slug:slug}", "getPost").unwrap();
//! table.insert(Method::GET, "/colors/{code:hex}", "getColor").unwrap();
//!
//! let m = table.match_route(&Method::GET, "/users/42/posts/hello-world").unwrap();
//! assert_eq!(*m.endpoint(), "getPost");
//! assert_eq!(m.params.get("id"), Some("42"));
//! assert_eq!(m.params.get("slug"), Some("hello-world"));
//!
//! assert!(table.match_route(&Method::GET, "/users/abc/posts/x").is_none());
//! ```

mod error;
mod params;
mod pattern;
mod registry;
mod table;

pub use error::{RouterError, RouterResult};
pub use params::Params;
pub use pattern::CompiledPattern;
pub use registry::{TypeRegistry, DEFAULT_TAG};
pub use table::{Route, RouteTable};

/// A matched route with its bound parameters.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    /// The matched route
    pub route: &'a Route<T>,
    /// Bound path parameters
    pub params: Params,
}

impl<'a, T> RouteMatch<'a, T> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(route: &'a Route<T>, params: Params) -> Self {
        Self { route, params }
    }

    /// Returns the endpoint payload of the matched route.
    #[must_use]
    pub fn endpoint(&self) -> &'a T {
        self.route.endpoint()
    }
}
