//! Declarative route trees.
//!
//! An application is described as a tree of [`Node`]s. Path prefixes,
//! middleware scopes and method leaves nest freely; the tree is flattened
//! once when the application is built.
//!
//! ```rust,ignore
//! use arbor_framework::tree::{get, post, router, scope};
//!
//! let tree = router("/api", [
//!     scope(RequestLogger::new(), [
//!         router("/users", [
//!             get(list_users),
//!             post(create_user),
//!             get(show_user).at("/:id"),
//!         ]),
//!     ]),
//!     get(health).at("/health"),
//! ]);
//! ```

use std::fmt;
use std::sync::Arc;

use http::Method;
use tracing::warn;

use crate::handler::{BoxedHandler, Handler, into_handler};
use crate::middleware::{BoxedMiddleware, Middleware};
use crate::validate::ValidateSpec;

/// A node in a route tree.
pub enum Node {
    /// Prefixes every descendant with `path`.
    Router {
        /// Path contribution of this node.
        path: String,
        /// Nested nodes.
        children: Vec<Node>,
    },
    /// Wraps every descendant route in `middleware`.
    ///
    /// A scope without middleware is a transparent grouping.
    Use {
        /// The middleware applied to descendants.
        middleware: Option<BoxedMiddleware>,
        /// Diagnostic name reported in the middleware index.
        name: Option<String>,
        /// Nested nodes.
        children: Vec<Node>,
    },
    /// A method leaf.
    ///
    /// A leaf with children only contributes its path to them and is not
    /// registered itself. A leaf without a handler is skipped.
    Route {
        /// The HTTP method served.
        method: Method,
        /// Optional path below the inherited prefix.
        path: Option<String>,
        /// The terminal handler.
        handler: Option<BoxedHandler>,
        /// Schemas applied before the middleware chain runs.
        validate: Option<Arc<ValidateSpec>>,
        /// Nested nodes.
        children: Vec<Node>,
    },
    /// Groups nodes without contributing anything.
    Fragment {
        /// Nested nodes.
        children: Vec<Node>,
    },
}

impl Node {
    /// Returns the node's children.
    pub fn children(&self) -> &[Node] {
        match self {
            Self::Router { children, .. }
            | Self::Use { children, .. }
            | Self::Route { children, .. }
            | Self::Fragment { children } => children,
        }
    }

    /// Appends a child node.
    pub fn child(mut self, node: Node) -> Self {
        match &mut self {
            Self::Router { children, .. }
            | Self::Use { children, .. }
            | Self::Route { children, .. }
            | Self::Fragment { children } => children.push(node),
        }
        self
    }

    /// Places this node below `path`.
    ///
    /// A method leaf takes the path as its own; any other node is wrapped in
    /// a [`Node::Router`].
    pub fn at(self, path: impl Into<String>) -> Self {
        let path = path.into();
        match self {
            Self::Route {
                method,
                path: own,
                handler,
                validate,
                children,
            } => Self::Route {
                method,
                path: Some(match own {
                    Some(own) => format!("{path}/{own}"),
                    None => path,
                }),
                handler,
                validate,
                children,
            },
            other => router(path, [other]),
        }
    }

    /// Attaches a validation spec to a method leaf.
    pub fn validate(mut self, spec: ValidateSpec) -> Self {
        match &mut self {
            Self::Route { validate, .. } => *validate = Some(Arc::new(spec)),
            _ => warn!("Ignoring validation spec on a non-route node"),
        }
        self
    }

    /// Names a middleware scope for the middleware index.
    pub fn named(mut self, scope_name: impl Into<String>) -> Self {
        match &mut self {
            Self::Use { name, .. } => *name = Some(scope_name.into()),
            _ => warn!("Ignoring name on a non-middleware node"),
        }
        self
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Router { path, children } => f
                .debug_struct("Router")
                .field("path", path)
                .field("children", children)
                .finish(),
            Self::Use {
                middleware,
                name,
                children,
            } => f
                .debug_struct("Use")
                .field("middleware", &middleware.is_some())
                .field("name", name)
                .field("children", children)
                .finish(),
            Self::Route {
                method,
                path,
                handler,
                validate,
                children,
            } => f
                .debug_struct("Route")
                .field("method", method)
                .field("path", path)
                .field("handler", &handler.is_some())
                .field("validate", &validate.is_some())
                .field("children", children)
                .finish(),
            Self::Fragment { children } => {
                f.debug_struct("Fragment").field("children", children).finish()
            }
        }
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Creates a path prefix node.
pub fn router(path: impl Into<String>, children: impl IntoIterator<Item = Node>) -> Node {
    Node::Router {
        path: path.into(),
        children: children.into_iter().collect(),
    }
}

/// Creates a middleware scope.
pub fn scope<M: Middleware>(middleware: M, children: impl IntoIterator<Item = Node>) -> Node {
    Node::Use {
        middleware: Some(Arc::new(middleware)),
        name: None,
        children: children.into_iter().collect(),
    }
}

/// Groups nodes without adding a path or middleware.
pub fn fragment(children: impl IntoIterator<Item = Node>) -> Node {
    Node::Fragment {
        children: children.into_iter().collect(),
    }
}

/// Creates a method leaf served by `handler`.
pub fn route<H, T>(method: Method, handler: H) -> Node
where
    H: Handler<T>,
    T: 'static,
{
    Node::Route {
        method,
        path: None,
        handler: Some(into_handler(handler)),
        validate: None,
        children: Vec::new(),
    }
}

macro_rules! method_builders {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Creates a `", stringify!($method), "` leaf.")]
            pub fn $name<H, T>(handler: H) -> Node
            where
                H: Handler<T>,
                T: 'static,
            {
                route(Method::$method, handler)
            }
        )*
    };
}

method_builders! {
    get => GET,
    post => POST,
    put => PUT,
    patch => PATCH,
    delete => DELETE,
    head => HEAD,
    options => OPTIONS,
}
