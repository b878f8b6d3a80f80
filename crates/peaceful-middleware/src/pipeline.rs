//! Middleware composition.
//!
//! Layers are stored as plain ordered lists and folded right-to-left around
//! the terminal handler when a request is dispatched, so the first layer in
//! the list is the outermost one:
//!
//! ```text
//! [A, B, C] + handler  =>  A(B(C(handler)))
//! ```
//!
//! A dispatcher that keeps several lists (global, group, route) concatenates
//! them with [`Iterator::chain`] and hands the result to [`compose`].

use std::sync::Arc;

use peaceful_core::RequestContext;

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{BoxedHandler, Request, Response};

/// A type-erased middleware that can be stored in a list.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Folds `layers` around `handler`, outermost first.
///
/// The handler receives a clone of the context as it stands after every
/// layer has run its pre-processing.
pub fn compose<'a, I>(layers: I, handler: BoxedHandler) -> Next<'a>
where
    I: IntoIterator<Item = &'a BoxedMiddleware>,
    I::IntoIter: DoubleEndedIterator,
{
    let terminal = move |ctx: &mut RequestContext, request: Request| -> BoxFuture<'static, Response> {
        handler(ctx.clone(), request)
    };

    layers
        .into_iter()
        .rev()
        .fold(Next::handler(terminal), |next, middleware| {
            Next::new(middleware.as_ref(), next)
        })
}

/// An ordered list of middleware.
///
/// # Example
///
/// ```
/// use peaceful_middleware::{handler_fn, Chain, Response, ResponseExt};
/// use peaceful_middleware::stages::RequestIdMiddleware;
/// use peaceful_core::RequestContext;
/// use http::StatusCode;
///
/// # tokio_test::block_on(async {
/// let mut chain = Chain::new();
/// chain.push(RequestIdMiddleware::new());
///
/// let handler = handler_fn(|_ctx, _req| async { Response::text(StatusCode::OK, "hi") });
/// let request = http::Request::new(Default::default());
/// let response = chain.run(RequestContext::new(), request, handler).await;
///
/// assert!(response.headers().contains_key("x-request-id"));
/// # });
/// ```
#[derive(Clone, Default)]
pub struct Chain {
    layers: Vec<BoxedMiddleware>,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware; it runs inside every layer added before it.
    pub fn push(&mut self, middleware: impl Middleware) -> &mut Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared middleware.
    pub fn push_arc(&mut self, middleware: BoxedMiddleware) -> &mut Self {
        self.layers.push(middleware);
        self
    }

    /// Appends every layer of `other`, keeping its order.
    pub fn extend(&mut self, other: &Chain) -> &mut Self {
        self.layers.extend(other.layers.iter().cloned());
        self
    }

    /// Returns an iterator over the layers, outermost first.
    pub fn iter(&self) -> std::slice::Iter<'_, BoxedMiddleware> {
        self.layers.iter()
    }

    /// Returns the stage names, outermost first.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|m| m.name()).collect()
    }

    /// Returns the number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if the chain has no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Runs `request` through every layer and then `handler`.
    pub async fn run(
        &self,
        mut ctx: RequestContext,
        request: Request,
        handler: BoxedHandler,
    ) -> Response {
        compose(self.layers.iter(), handler)
            .run(&mut ctx, request)
            .await
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a BoxedMiddleware;
    type IntoIter = std::slice::Iter<'a, BoxedMiddleware>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
