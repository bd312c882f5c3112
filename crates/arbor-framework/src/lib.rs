//! # Arbor Framework
//!
//! Routing, middleware composition and dispatch for Arbor applications.
//!
//! This layer provides:
//! - Declarative route trees ([`tree`]) flattened into route records
//! - A compile-once routing trie with `404`/`405` distinction ([`trie`])
//! - Per-request contexts and Axum-style extractors
//! - Handler trait for functions with dependency injection
//! - Middleware composition with single-use continuations
//! - Schema-based request validation
//! - The [`App`] handle that ties everything together and implements
//!   `tower::Service`
//!
//! ```text
//!  Node tree ──flatten──▶ RouteRecords ──compose + insert──▶ Trie<Endpoint>
//!                                                               │
//!  Request ──match──▶ Context ──validate──▶ chain ──▶ Response ◀─┘
//! ```

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod flatten;
pub mod handler;
pub mod lenient;
pub mod middleware;
pub mod path;
pub mod tree;
pub mod trie;
pub mod validate;

pub use context::{Context, RequestContext};
pub use dispatcher::{App, DEFAULT_MAX_BODY_BYTES, DispatchOptions};
pub use error::{
    ChainError, ExtractError, ExtractResult, RequestPart, RouteError, SchemaError,
    ValidationError,
};
pub use extractor::{Body, Extension, FromContext, Headers, Params, Query};
pub use flatten::{Flattened, MiddlewareEntry, RouteRecord, flatten};
pub use handler::{BoxedHandler, ErasedHandler, Handler, HandlerFn, Terminal, into_handler};
pub use middleware::{
    BoxedMiddleware, Composed, Middleware, Next, RequestLogger, SetHeader, compose,
};
pub use tree::{Node, delete, fragment, get, head, options, patch, post, put, route, router, scope};
pub use trie::{MatchOutcome, PathParams, Trie, TrieBuilder};
pub use validate::{Schema, Typed, ValidateSpec, typed, validate};
