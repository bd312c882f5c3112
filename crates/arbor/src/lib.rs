//! # Arbor
//!
//! A declarative route-tree HTTP framework with onion middleware.
//!
//! ## Overview
//!
//! Applications are described as a tree of nodes: routers contribute path
//! prefixes, scopes attach middleware to everything below them, and method
//! leaves carry handlers. The tree is compiled once into a routing trie;
//! every request is then matched, validated and run through its middleware
//! chain.
//!
//! ```text
//! ┌────────────┐  flatten  ┌──────────────┐  compose  ┌──────────────────┐
//! │ Node tree  │──────────▶│ RouteRecords │──────────▶│ Trie<Endpoint>   │
//! └────────────┘           └──────────────┘           └──────────────────┘
//!                                                              │ match
//! Request ──▶ Context ──▶ validate ──▶ outer mw ─▶ inner mw ─▶ handler
//!                                          ◀───────── Reply ◀──┘
//! ```
//!
//! - **Core**: `Reply`, `IntoReply`, `HttpError` and response helpers
//! - **Framework**: tree builders, trie, extractors, middleware and [`App`](framework::App)
//! - **Runtime**: configuration, logging and the [`Arbor`](runtime::Arbor) bootstrap
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use arbor::prelude::*;
//!
//! async fn show(Params(id): Params<u64>) -> Json<serde_json::Value> {
//!     Json(serde_json::json!({ "id": id }))
//! }
//!
//! let app = Arbor::builder().init_logging().build()?.build(router("/api", [
//!     scope(RequestLogger, [
//!         router("/users", [get(show).at(":id")]),
//!     ]),
//! ]))?;
//!
//! let response = app.handle(request).await;
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use arbor_core as core;
pub use arbor_framework as framework;
pub use arbor_runtime as runtime;

/// Commonly used types for building applications.
///
/// ```rust,ignore
/// use arbor::prelude::*;
/// ```
pub mod prelude {
    // Bootstrap
    pub use arbor_runtime::{Arbor, ArborConfig};

    // Route tree
    pub use arbor_framework::{
        App, Node, delete, fragment, get, head, options, patch, post, put, route, router, scope,
    };

    // Handlers and extractors
    pub use arbor_framework::{
        Body, Context, Extension, FromContext, Headers, Params, Query, RequestContext,
    };

    // Middleware
    pub use arbor_framework::{Middleware, Next, RequestLogger, SetHeader};

    // Validation
    pub use arbor_framework::{Schema, SchemaError, ValidateSpec, typed};

    // Replies
    pub use arbor_core::{
        BoxError, HttpError, IntoReply, Json, Reply, Request, Response, ResponseInit, empty,
        json_response, text,
    };
}
