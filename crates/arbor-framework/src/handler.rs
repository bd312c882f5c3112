//! Handler system for the Arbor framework.
//!
//! This module defines the [`Handler`] trait that adapts ordinary async
//! functions into route handlers. Handlers are implemented via blanket
//! implementations for functions with different arities, similar to Axum's
//! handler system.
//!
//! # Example
//!
//! ```rust,ignore
//! use arbor_framework::{Body, Context, Json, Params};
//!
//! // No parameters, no return value: answers 200 with a `null` body
//! async fn ping() {}
//!
//! // Extractors and a JSON reply
//! async fn show(Params(id): Params<u64>) -> Json<User> {
//!     Json(load(id))
//! }
//!
//! // Full access to the context and a hand-built response
//! async fn create(ctx: Context, Body(user): Body<NewUser>) -> Result<Response, HttpError> {
//!     Ok(ctx.json(&save(user)?, StatusCode::CREATED)?)
//! }
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use http::StatusCode;
use serde_json::Value;

use arbor_core::{BoxError, HttpError, IntoReply, Reply, json_response};

use crate::context::Context;
use crate::extractor::FromContext;
use crate::middleware::{Middleware, Next};

// ============================================================================
// Handler Trait
// ============================================================================

/// The core trait for route handlers.
///
/// # Blanket Implementation
///
/// This trait is automatically implemented for async functions that:
/// - Take 0-8 parameters that implement [`FromContext`]
/// - Return a type implementing [`IntoReply`]
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Call the handler with the given context.
    fn call(self, ctx: Context) -> BoxFuture<'static, Result<Reply, BoxError>>;
}

// ============================================================================
// Type erasure
// ============================================================================

/// A wrapper that converts a function into a boxed handler.
pub struct HandlerFn<F, T> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<F, T> HandlerFn<F, T> {
    /// Creates a new handler function wrapper.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F: Clone, T> Clone for HandlerFn<F, T> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            _marker: PhantomData,
        }
    }
}

/// A type-erased handler that can be stored in route records.
pub type BoxedHandler = Arc<dyn ErasedHandler>;

/// Type-erased handler trait for dynamic dispatch.
pub trait ErasedHandler: Send + Sync {
    /// Execute the handler with the given context.
    fn call(&self, ctx: Context) -> BoxFuture<'static, Result<Reply, BoxError>>;
}

impl<F, T> ErasedHandler for HandlerFn<F, T>
where
    F: Handler<T>,
    T: 'static,
{
    fn call(&self, ctx: Context) -> BoxFuture<'static, Result<Reply, BoxError>> {
        self.f.clone().call(ctx)
    }
}

/// Convert a handler function into a boxed handler.
pub fn into_handler<F, T>(f: F) -> BoxedHandler
where
    F: Handler<T>,
    T: 'static,
{
    Arc::new(HandlerFn::new(f))
}

// ============================================================================
// Handler implementations for functions (Axum-style)
// ============================================================================

impl<F, Fut, R> Handler<()> for F
where
    F: FnOnce() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply,
{
    fn call(self, _ctx: Context) -> BoxFuture<'static, Result<Reply, BoxError>> {
        Box::pin(async move { (self)().await.into_reply() })
    }
}

/// Macro to generate Handler implementations for functions with different arities.
macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case)]
        impl<F, Fut, R, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoReply,
            $( $ty: FromContext + Send + 'static, )*
        {
            fn call(self, ctx: Context) -> BoxFuture<'static, Result<Reply, BoxError>> {
                Box::pin(async move {
                    $(
                        let $ty = $ty::from_context(&ctx).map_err(HttpError::from)?;
                    )*

                    (self)($($ty,)*).await.into_reply()
                })
            }
        }
    };
}

impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

// ============================================================================
// Terminal
// ============================================================================

/// The innermost element of every route chain.
///
/// Runs the route's handler and turns its reply into a response: a
/// [`Reply::Response`] passes through untouched, any other value is
/// serialized as JSON with status 200 (`Reply::Empty` becomes `null`). The
/// continuation it receives is never run.
pub struct Terminal {
    handler: BoxedHandler,
}

impl Terminal {
    /// Wraps a handler.
    pub fn new(handler: BoxedHandler) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl Middleware for Terminal {
    async fn handle(&self, ctx: Context, _next: Next) -> Result<Reply, BoxError> {
        let value = match self.handler.call(ctx).await? {
            Reply::Response(res) => return Ok(Reply::Response(res)),
            Reply::Value(value) => value,
            Reply::Empty => Value::Null,
        };
        Ok(Reply::Response(json_response(&value, StatusCode::OK)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::extractor::Params;
    use arbor_core::Json;
    use bytes::Bytes;

    fn ctx() -> Context {
        let req = http::Request::builder()
            .uri("/users/7")
            .body(Bytes::new())
            .unwrap();
        Arc::new(RequestContext::new(req))
    }

    fn run<H: Handler<T>, T: 'static>(h: H, ctx: Context) -> Result<Reply, BoxError> {
        tokio_test::block_on(into_handler(h).call(ctx))
    }

    #[test]
    fn test_zero_arity() {
        async fn ping() {}
        assert!(matches!(run(ping, ctx()).unwrap(), Reply::Empty));
    }

    #[test]
    fn test_extractor_arity() {
        async fn show(Params(id): Params<u64>, ctx: Context) -> Json<serde_json::Value> {
            Json(serde_json::json!({"id": id, "path": ctx.uri().path()}))
        }

        let ctx = ctx();
        ctx.set_params(serde_json::json!({"id": "7"}));
        match run(show, ctx).unwrap() {
            Reply::Value(v) => assert_eq!(v, serde_json::json!({"id": 7, "path": "/users/7"})),
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn test_extraction_failure_is_bad_request() {
        async fn show(Params(_id): Params<u64>) {}

        let ctx = ctx();
        ctx.set_params(serde_json::json!({"id": "seven"}));
        let err = run(show, ctx).unwrap_err();
        let http = err.downcast_ref::<HttpError>().unwrap();
        assert_eq!(http.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_terminal_serializes_values() {
        async fn nothing() {}
        async fn teapot() -> arbor_core::Response {
            arbor_core::text(StatusCode::IM_A_TEAPOT, "short and stout")
        }

        let run_terminal = |handler: BoxedHandler| async move {
            let chain = crate::middleware::compose(Vec::new(), Arc::new(Terminal::new(handler)));
            chain.call(ctx(), None).await.unwrap().into_response().unwrap()
        };

        let res = run_terminal(into_handler(nothing)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body().as_ref(), b"null");

        let res = run_terminal(into_handler(teapot)).await;
        assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(res.body().as_ref(), b"short and stout");
    }
}
