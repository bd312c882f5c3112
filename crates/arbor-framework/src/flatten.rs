//! Flattening of route trees into route records.

use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::handler::BoxedHandler;
use crate::middleware::BoxedMiddleware;
use crate::path;
use crate::tree::Node;
use crate::validate::ValidateSpec;

/// Name reported for middleware scopes that were not named.
pub const ANONYMOUS_SCOPE: &str = "anonymous";

/// One registered route, with everything inherited from its ancestors.
#[derive(Clone)]
pub struct RouteRecord {
    /// The HTTP method served.
    pub method: Method,
    /// Normalized path components, captures still in `:name` / `*` form.
    pub segments: Vec<String>,
    /// The terminal handler.
    pub handler: BoxedHandler,
    /// Schemas applied before the chain runs.
    pub validate: Option<Arc<ValidateSpec>>,
    /// Middleware stack, outermost first.
    pub middleware: Vec<BoxedMiddleware>,
}

impl RouteRecord {
    /// Returns the normalized route pattern, e.g. `/users/:id`.
    pub fn path(&self) -> String {
        path::join(&self.segments)
    }
}

impl std::fmt::Debug for RouteRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteRecord")
            .field("method", &self.method)
            .field("path", &self.path())
            .field("middleware", &self.middleware.len())
            .field("validate", &self.validate.is_some())
            .finish_non_exhaustive()
    }
}

/// Diagnostic entry describing a middleware scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareEntry {
    /// The scope's name, or [`ANONYMOUS_SCOPE`].
    pub name: String,
    /// Depth of the scope node in the tree (root = 0).
    pub depth: usize,
    /// The path prefix in effect at the scope.
    pub prefix: String,
}

/// The output of [`flatten`].
#[derive(Debug, Default)]
pub struct Flattened {
    /// Registered routes in depth-first, left-to-right order.
    pub routes: Vec<RouteRecord>,
    /// Middleware scopes in the same order.
    pub middleware_index: Vec<MiddlewareEntry>,
}

/// Walks a route tree once and collects its routes.
pub fn flatten(root: &Node) -> Flattened {
    let mut out = Flattened::default();
    walk(root, &[], &[], 0, &mut out);
    out
}

fn walk(
    node: &Node,
    prefix: &[String],
    stack: &[BoxedMiddleware],
    depth: usize,
    out: &mut Flattened,
) {
    match node {
        Node::Router { path, children } => {
            let prefix = extend(prefix, path);
            for child in children {
                walk(child, &prefix, stack, depth + 1, out);
            }
        }
        Node::Use {
            middleware,
            name,
            children,
        } => {
            let Some(middleware) = middleware else {
                for child in children {
                    walk(child, prefix, stack, depth + 1, out);
                }
                return;
            };

            out.middleware_index.push(MiddlewareEntry {
                name: name.clone().unwrap_or_else(|| ANONYMOUS_SCOPE.to_owned()),
                depth,
                prefix: path::join(prefix),
            });

            let mut inner = stack.to_vec();
            inner.push(Arc::clone(middleware));
            for child in children {
                walk(child, prefix, &inner, depth + 1, out);
            }
        }
        Node::Route {
            method,
            path: own,
            handler,
            validate,
            children,
        } => {
            let prefix = match own {
                Some(own) => extend(prefix, own),
                None => prefix.to_vec(),
            };

            if !children.is_empty() {
                for child in children {
                    walk(child, &prefix, stack, depth + 1, out);
                }
                return;
            }

            let Some(handler) = handler else {
                debug!(
                    method = %method,
                    path = %path::join(&prefix),
                    "Skipping route without a handler"
                );
                return;
            };

            out.routes.push(RouteRecord {
                method: method.clone(),
                segments: prefix,
                handler: Arc::clone(handler),
                validate: validate.clone(),
                middleware: stack.to_vec(),
            });
        }
        Node::Fragment { children } => {
            for child in children {
                walk(child, prefix, stack, depth + 1, out);
            }
        }
    }
}

fn extend(prefix: &[String], path: &str) -> Vec<String> {
    prefix
        .iter()
        .cloned()
        .chain(path::segments(path).map(str::to_owned))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::middleware::Next;
    use crate::tree::{fragment, get, post, router, scope};

    async fn noop() {}

    async fn pass(_ctx: Context, next: Next) -> Result<arbor_core::Reply, arbor_core::BoxError> {
        next.run().await
    }

    fn summary(flat: &Flattened) -> Vec<(Method, String, usize)> {
        flat.routes
            .iter()
            .map(|r| (r.method.clone(), r.path(), r.middleware.len()))
            .collect()
    }

    #[test]
    fn test_prefixes_and_stacks() {
        let tree = router("/api/", [
            scope(pass, [
                router("users", [get(noop), post(noop), get(noop).at("/:id")]),
                scope(pass, [get(noop).at("/admin")]).named("admin"),
            ]),
            fragment([get(noop).at("health")]),
        ]);

        let flat = flatten(&tree);
        assert_eq!(
            summary(&flat),
            vec![
                (Method::GET, "/api/users".into(), 1),
                (Method::POST, "/api/users".into(), 1),
                (Method::GET, "/api/users/:id".into(), 1),
                (Method::GET, "/api/admin".into(), 2),
                (Method::GET, "/api/health".into(), 0),
            ]
        );
        assert_eq!(
            flat.middleware_index,
            vec![
                MiddlewareEntry {
                    name: ANONYMOUS_SCOPE.into(),
                    depth: 1,
                    prefix: "/api".into(),
                },
                MiddlewareEntry {
                    name: "admin".into(),
                    depth: 2,
                    prefix: "/api".into(),
                },
            ]
        );
    }

    #[test]
    fn test_route_with_children_is_pass_through() {
        let tree = get(noop).at("/v1").child(get(noop).at("/ping"));
        let flat = flatten(&tree);
        assert_eq!(summary(&flat), vec![(Method::GET, "/v1/ping".into(), 0)]);
    }

    #[test]
    fn test_handlerless_leaf_is_skipped() {
        let tree = fragment([
            Node::Route {
                method: Method::GET,
                path: Some("/nothing".into()),
                handler: None,
                validate: None,
                children: Vec::new(),
            },
            Node::Use {
                middleware: None,
                name: None,
                children: vec![get(noop).at("/x")],
            },
        ]);
        let flat = flatten(&tree);
        assert_eq!(summary(&flat), vec![(Method::GET, "/x".into(), 0)]);
        assert!(flat.middleware_index.is_empty());
    }
}
