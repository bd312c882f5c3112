//! Built-in middleware.

use std::time::Instant;

use async_trait::async_trait;
use http::header::{HeaderName, HeaderValue};
use tracing::{Instrument, info, info_span, warn};

use arbor_core::{BoxError, Reply};

use super::{Middleware, Next};
use crate::context::Context;

/// Logs every request that passes through it.
///
/// The rest of the chain runs inside a `request` span carrying the method and
/// path; completion is logged with the status (when the chain produced a
/// response) and the elapsed time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger;

impl RequestLogger {
    /// Creates a request logger.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for RequestLogger {
    async fn handle(&self, ctx: Context, next: Next) -> Result<Reply, BoxError> {
        let span = info_span!("request", method = %ctx.method(), path = %ctx.uri().path());
        let start = Instant::now();

        let result = next.run().instrument(span.clone()).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        span.in_scope(|| match &result {
            Ok(reply) => {
                let status = reply.as_response().map(|res| res.status().as_u16());
                info!(?status, elapsed_ms, "Request completed");
            }
            Err(e) => warn!(error = %e, elapsed_ms, "Request failed"),
        });
        result
    }
}

/// Sets a header on the response produced downstream.
///
/// Replies that are not responses yet are left alone. An existing header of
/// the same name is overwritten.
#[derive(Debug, Clone)]
pub struct SetHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl SetHeader {
    /// Creates the middleware.
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }
}

#[async_trait]
impl Middleware for SetHeader {
    async fn handle(&self, _ctx: Context, next: Next) -> Result<Reply, BoxError> {
        let mut reply = next.run().await?;
        if let Reply::Response(res) = &mut reply {
            res.headers_mut().insert(self.name.clone(), self.value.clone());
        }
        Ok(reply)
    }
}
