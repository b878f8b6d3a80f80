//! Request logging stage.

use std::time::Instant;

use peaceful_core::RequestContext;

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};

/// Logs one `info` event per request with method, URI, status and elapsed
/// time, measured around everything downstream of this stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    /// Creates the logging stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for LoggingMiddleware {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let method = request.method().clone();
            let uri = request.uri().clone();
            let start = Instant::now();

            let response = next.run(ctx, request).await;

            let elapsed = start.elapsed();
            tracing::info!(
                request_id = %ctx.request_id(),
                method = %method,
                path = %uri,
                status = response.status().as_u16(),
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                "request completed"
            );
            response
        })
    }
}
