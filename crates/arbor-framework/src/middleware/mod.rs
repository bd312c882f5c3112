//! Middleware and chain composition.
//!
//! A middleware receives the request [`Context`] and a [`Next`] continuation.
//! It may run code before and after calling `next.run()`, or return without
//! calling it at all to short-circuit everything downstream:
//!
//! ```rust,ignore
//! async fn auth(ctx: Context, next: Next) -> Result<Reply, BoxError> {
//!     if ctx.raw_headers().get(AUTHORIZATION).is_none() {
//!         return Err(HttpError::unauthorized().into());
//!     }
//!     next.run().await
//! }
//! ```
//!
//! # Composition
//!
//! [`compose`] turns a stack of middleware plus a terminal element into one
//! [`Composed`] callable. Elements are entered front to back and exited back
//! to front:
//!
//! ```text
//! outer ─▶ inner ─▶ terminal
//!   ◀────────◀─────────┘
//! enter:outer, enter:inner, exit:inner, exit:outer
//! ```
//!
//! Each call keeps a cursor of the highest position dispatched so far. Running
//! a continuation whose position was already reached fails with
//! [`ChainError::ContinuationReused`], and the whole call fails even if the
//! middleware swallows that error. Downstream elements therefore run at most
//! once per call.

pub mod builtin;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::warn;

use arbor_core::{BoxError, IntoReply, Reply};

use crate::context::Context;
use crate::error::ChainError;

pub use builtin::{RequestLogger, SetHeader};

/// A wrapping handler in a route's chain.
///
/// Implemented for async functions and closures of the form
/// `Fn(Context, Next) -> impl Future<Output = R>` where `R: IntoReply`.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Handles the request, optionally running the rest of the chain.
    async fn handle(&self, ctx: Context, next: Next) -> Result<Reply, BoxError>;
}

#[async_trait]
impl<F, Fut, R> Middleware for F
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    async fn handle(&self, ctx: Context, next: Next) -> Result<Reply, BoxError> {
        (self)(ctx, next).await.into_reply()
    }
}

/// A type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

// ============================================================================
// Continuations
// ============================================================================

/// The continuation handed to a middleware.
///
/// Running it dispatches the next element of the chain. It may be cloned and
/// moved freely, but running any clone a second time is a protocol violation.
#[derive(Clone)]
pub struct Next {
    run: Arc<ChainRun>,
    position: usize,
}

impl Next {
    /// Runs the remainder of the chain.
    pub fn run(&self) -> BoxFuture<'static, Result<Reply, BoxError>> {
        Arc::clone(&self.run).dispatch(self.position)
    }

    /// Returns the chain position this continuation dispatches.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .field("len", &self.run.elements.len())
            .finish()
    }
}

/// State of one call through a composed chain.
struct ChainRun {
    elements: Arc<[BoxedMiddleware]>,
    ctx: Context,
    /// Highest position dispatched so far.
    cursor: Mutex<Option<usize>>,
    violation: Mutex<Option<ChainError>>,
    outer: Option<Next>,
}

impl ChainRun {
    fn dispatch(self: Arc<Self>, position: usize) -> BoxFuture<'static, Result<Reply, BoxError>> {
        async move {
            {
                let mut cursor = self.cursor.lock();
                if cursor.is_some_and(|reached| position <= reached) {
                    let err = ChainError::ContinuationReused { position };
                    warn!(position, "Continuation invoked more than once");
                    self.violation.lock().get_or_insert(err.clone());
                    return Err(err.into());
                }
                *cursor = Some(position);
            }

            match self.elements.get(position) {
                Some(element) => {
                    let next = Next {
                        run: Arc::clone(&self),
                        position: position + 1,
                    };
                    element.handle(Arc::clone(&self.ctx), next).await
                }
                None => match &self.outer {
                    Some(outer) => outer.run().await,
                    None => Ok(Reply::Empty),
                },
            }
        }
        .boxed()
    }
}

// ============================================================================
// Composition
// ============================================================================

/// A middleware stack composed with its terminal element.
#[derive(Clone)]
pub struct Composed {
    elements: Arc<[BoxedMiddleware]>,
}

/// Composes `stack` (outermost first) around `terminal`.
pub fn compose(
    stack: impl IntoIterator<Item = BoxedMiddleware>,
    terminal: BoxedMiddleware,
) -> Composed {
    let elements: Vec<BoxedMiddleware> = stack.into_iter().chain(Some(terminal)).collect();
    Composed {
        elements: elements.into(),
    }
}

impl Composed {
    /// Returns the number of elements, terminal included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the chain has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Runs the chain once.
    ///
    /// `outer` is the continuation run when the last element calls its own
    /// `next`; without one that call yields [`Reply::Empty`].
    ///
    /// # Errors
    ///
    /// Fails with the first error escaping the chain, or with
    /// [`ChainError::ContinuationReused`] if any continuation was run twice.
    pub async fn call(&self, ctx: Context, outer: Option<Next>) -> Result<Reply, BoxError> {
        let run = Arc::new(ChainRun {
            elements: Arc::clone(&self.elements),
            ctx,
            cursor: Mutex::new(None),
            violation: Mutex::new(None),
            outer,
        });

        let result = Arc::clone(&run).dispatch(0).await;
        let violation = run.violation.lock().take();
        match violation {
            Some(err) => Err(err.into()),
            None => result,
        }
    }
}

#[async_trait]
impl Middleware for Composed {
    async fn handle(&self, ctx: Context, next: Next) -> Result<Reply, BoxError> {
        self.call(ctx, Some(next)).await
    }
}

impl std::fmt::Debug for Composed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composed").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use bytes::Bytes;
    use http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx() -> Context {
        let req = http::Request::builder().uri("/").body(Bytes::new()).unwrap();
        Arc::new(RequestContext::new(req))
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, name: &'static str) -> BoxedMiddleware {
        let log = Arc::clone(log);
        Arc::new(move |_ctx: Context, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(format!("enter:{name}"));
                let reply = next.run().await;
                log.lock().push(format!("exit:{name}"));
                reply
            }
        })
    }

    fn terminal(log: &Log) -> BoxedMiddleware {
        let log = Arc::clone(log);
        Arc::new(move |_ctx: Context, _next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push("terminal".to_owned());
                arbor_core::text(StatusCode::OK, "done")
            }
        })
    }

    #[tokio::test]
    async fn test_onion_order() {
        let log: Log = Arc::default();
        let chain = compose(
            [recorder(&log, "outer"), recorder(&log, "inner")],
            terminal(&log),
        );

        let reply = chain.call(ctx(), None).await.unwrap();
        assert!(reply.is_response());
        assert_eq!(
            *log.lock(),
            vec!["enter:outer", "enter:inner", "terminal", "exit:inner", "exit:outer"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit() {
        let log: Log = Arc::default();
        let gate: BoxedMiddleware = Arc::new(|_ctx: Context, _next: Next| async {
            arbor_core::text(StatusCode::UNAUTHORIZED, "nope")
        });
        let chain = compose([gate, recorder(&log, "inner")], terminal(&log));

        let res = chain.call(ctx(), None).await.unwrap().into_response().unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_double_next_fails_even_if_swallowed() {
        let hits = Arc::new(AtomicUsize::new(0));
        let twice: BoxedMiddleware = Arc::new(|_ctx: Context, next: Next| async move {
            let first = next.run().await;
            // The second call's error is discarded on purpose.
            let _ = next.run().await;
            first
        });
        let counter = Arc::clone(&hits);
        let downstream: BoxedMiddleware = Arc::new(move |_ctx: Context, _next: Next| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let err = compose([twice], downstream).call(ctx(), None).await.unwrap_err();
        let chain_err = err.downcast_ref::<ChainError>().unwrap();
        assert_eq!(*chain_err, ChainError::ContinuationReused { position: 1 });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_terminal_next_runs_outer() {
        let log: Log = Arc::default();
        let inner = compose(
            [recorder(&log, "inner")],
            Arc::new(|_ctx: Context, next: Next| async move { next.run().await }),
        );
        let inner: BoxedMiddleware = Arc::new(inner);
        let outer = compose([recorder(&log, "outer"), inner], terminal(&log));

        outer.call(ctx(), None).await.unwrap();
        assert_eq!(
            *log.lock(),
            vec!["enter:outer", "enter:inner", "terminal", "exit:inner", "exit:outer"]
        );
    }

    #[tokio::test]
    async fn test_missing_outer_is_empty() {
        let chain = compose(
            Vec::new(),
            Arc::new(|_ctx: Context, next: Next| async move { next.run().await }),
        );
        assert!(matches!(chain.call(ctx(), None).await.unwrap(), Reply::Empty));
    }
}
