//! Request dispatcher for the Arbor framework.
//!
//! This module provides [`App`], the bound application handle produced from a
//! route tree. Building an app flattens the tree, composes one middleware
//! chain per route and freezes everything into a routing trie. Afterwards the
//! app only reads, so it is cheap to clone and safe to share across tasks.
//!
//! # Request lifecycle
//!
//! 1. The method and path are matched against the trie
//! 2. A [`RequestContext`] is decoded from the request
//! 3. Path parameters are stored and the route's schemas are applied
//! 4. The route's chain runs (middleware, then the handler)
//! 5. The outcome is mapped to the final response
//!
//! | Outcome                                | Response                                  |
//! |----------------------------------------|-------------------------------------------|
//! | no route for the path                  | `404` text, `Not Found`                   |
//! | path exists, method not registered     | `405` text, `Method Not Allowed`, `Allow` |
//! | body over the configured limit         | `413` problem+json                        |
//! | schema rejected a request part         | `400` JSON `{"error":"ValidationError"}`  |
//! | chain returned a response              | that response, untouched                  |
//! | chain returned a non-response value    | recorded response, else empty `204`       |
//! | chain failed with an [`HttpError`]     | problem+json with the error's status      |
//! | any other failure or a panic           | `500` text, `Internal Server Error`       |
//!
//! ```rust,ignore
//! let app = App::build(router("/api", [get(health).at("/health")]))?;
//! let res = app.handle(request).await;
//! ```

use std::any::Any;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use http::header::{ALLOW, HeaderValue};
use http::{Method, StatusCode};
use serde_json::{Map, Value, json};
use tower::Service;
use tracing::{Instrument, Level, debug, error, info, span, warn};

use arbor_core::{BoxError, HttpError, Reply, Request, Response, empty, json_response, text};

use crate::context::RequestContext;
use crate::error::{RouteError, ValidationError};
use crate::flatten::{MiddlewareEntry, flatten};
use crate::handler::Terminal;
use crate::middleware::{Composed, compose};
use crate::trie::{MatchOutcome, PathParams, Trie};
use crate::tree::Node;
use crate::validate::{ValidateSpec, validate};

/// Default request body limit: 2 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Per-application dispatch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Largest accepted request body; `None` disables the check.
    pub max_body_bytes: Option<usize>,
    /// Whether `405` responses carry an `Allow` header.
    pub allow_header: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            max_body_bytes: Some(DEFAULT_MAX_BODY_BYTES),
            allow_header: true,
        }
    }
}

/// Everything a matched route needs at request time.
struct Endpoint {
    pattern: String,
    validate: Option<Arc<ValidateSpec>>,
    chain: Composed,
}

struct AppInner {
    trie: Trie<Endpoint>,
    options: DispatchOptions,
    middleware_index: Vec<MiddlewareEntry>,
}

/// A built application.
///
/// `App` is `Clone + Send + Sync`; clones share one immutable route table.
#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

impl App {
    /// Builds an application with default options.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for malformed or conflicting routes.
    pub fn build(root: Node) -> Result<Self, RouteError> {
        Self::with_options(root, DispatchOptions::default())
    }

    /// Builds an application with the given options.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for malformed or conflicting routes.
    pub fn with_options(root: Node, options: DispatchOptions) -> Result<Self, RouteError> {
        let flat = flatten(&root);
        let mut builder = Trie::builder();

        for record in flat.routes {
            let pattern = record.path();
            let terminal = Arc::new(Terminal::new(record.handler));
            let endpoint = Endpoint {
                pattern: pattern.clone(),
                validate: record.validate,
                chain: compose(record.middleware, terminal),
            };
            debug!(method = %record.method, path = %pattern, "Registering route");
            builder.insert(record.method, &pattern, endpoint).inspect_err(|e| {
                error!(error = %e, "Invalid route table");
            })?;
        }

        let trie = builder.build();
        info!(
            routes = trie.len(),
            middleware = flat.middleware_index.len(),
            "Route table built"
        );

        Ok(Self {
            inner: Arc::new(AppInner {
                trie,
                options,
                middleware_index: flat.middleware_index,
            }),
        })
    }

    /// Returns the number of registered `(method, path)` pairs.
    pub fn route_count(&self) -> usize {
        self.inner.trie.len()
    }

    /// Returns the middleware scopes found while building.
    pub fn middleware_index(&self) -> &[MiddlewareEntry] {
        &self.inner.middleware_index
    }

    /// Returns the dispatch options.
    pub fn options(&self) -> &DispatchOptions {
        &self.inner.options
    }

    /// Handles one request. Never fails; every outcome is a response.
    pub async fn handle(&self, request: Request) -> Response {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            method = %request.method(),
            path = %request.uri().path()
        );
        self.dispatch(request).instrument(span).await
    }

    async fn dispatch(&self, request: Request) -> Response {
        let (params, endpoint) =
            match self.inner.trie.at(request.method(), request.uri().path()) {
                MatchOutcome::Found { params, value } => (params, value),
                MatchOutcome::MethodNotAllowed { allowed, .. } => {
                    debug!(?allowed, "Method not allowed");
                    return self.method_not_allowed(&allowed);
                }
                MatchOutcome::NotFound => {
                    debug!("No route matched");
                    return text(StatusCode::NOT_FOUND, "Not Found");
                }
            };
        debug!(route = %endpoint.pattern, "Matched route");

        let ctx = match RequestContext::from_request(request, &self.inner.options) {
            Ok(ctx) => Arc::new(ctx),
            Err(e) => {
                warn!(error = %e, "Rejecting request body");
                return HttpError::from(e).into_response();
            }
        };
        ctx.set_params(params_to_value(params));

        if let Some(spec) = &endpoint.validate {
            match std::panic::catch_unwind(AssertUnwindSafe(|| validate(&ctx, spec))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return validation_response(&e),
                Err(panic) => {
                    error!(panic = panic_message(panic.as_ref()), "Schema panicked");
                    return internal_error();
                }
            }
        }

        let outcome = AssertUnwindSafe(endpoint.chain.call(Arc::clone(&ctx), None))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(Reply::Response(res))) => res,
            Ok(Ok(_)) => ctx.take_response().unwrap_or_else(|| empty(StatusCode::NO_CONTENT)),
            Ok(Err(e)) => error_response(e),
            Err(panic) => {
                error!(panic = panic_message(panic.as_ref()), "Handler panicked");
                internal_error()
            }
        }
    }

    fn method_not_allowed(&self, allowed: &[Method]) -> Response {
        let mut res = text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        if self.inner.options.allow_header {
            let list = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
            if let Ok(value) = HeaderValue::from_str(&list) {
                res.headers_mut().insert(ALLOW, value);
            }
        }
        res
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("routes", &self.route_count())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl Service<Request> for App {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let app = self.clone();
        async move { Ok(app.handle(request).await) }.boxed()
    }
}

// ============================================================================
// Outcome mapping
// ============================================================================

fn params_to_value(params: PathParams) -> Value {
    let map: Map<String, Value> = params
        .into_iter()
        .map(|(name, value)| (name, Value::String(value)))
        .collect();
    Value::Object(map)
}

fn validation_response(err: &ValidationError) -> Response {
    let body = json!({
        "error": "ValidationError",
        "message": err.to_string(),
    });
    json_response(&body, StatusCode::BAD_REQUEST).unwrap_or_else(|_| internal_error())
}

fn error_response(err: BoxError) -> Response {
    let err = match err.downcast::<HttpError>() {
        Ok(http) => return http.into_response(),
        Err(err) => err,
    };
    let err = match err.downcast::<ValidationError>() {
        Ok(validation) => return validation_response(&validation),
        Err(err) => err,
    };
    error!(error = %err, "Request failed");
    internal_error()
}

fn internal_error() -> Response {
    text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
