//! Segment trie for route resolution.
//!
//! Routes are inserted through a [`TrieBuilder`] and frozen into a [`Trie`].
//! A frozen trie has no mutating methods, so it can be shared behind an
//! `Arc` and read by any number of in-flight requests without locking.
//!
//! # Matching
//!
//! Matching is a recursive descent with explicit fallback. At every node the
//! literal child is tried first, then the parameter child, then the wildcard
//! child. When a subtree cannot complete the match the search backtracks, so
//! a static segment always wins over a parameter at the same depth without
//! letting a greedy parameter shadow a more specific route further down:
//!
//! ```text
//! GET /users/me          GET /users/:id        GET /files/*
//!
//!   /users/me   -> literal route, no params
//!   /users/123  -> param route, { id: "123" }
//!   /files/a/b  -> wildcard route, { "*": "a/b" }
//! ```
//!
//! The search is method-aware. It first looks for a node that serves the
//! requested method; only if none exists does it look for any node where
//! routes terminate, which turns a "not found" into "method not allowed".

use std::collections::{BTreeMap, HashMap};

use http::Method;

use crate::error::RouteError;
use crate::path::{self, Segment};

/// Path parameters captured by a match, keyed by name.
pub type PathParams = BTreeMap<String, String>;

struct TrieNode<T> {
    literals: HashMap<String, TrieNode<T>>,
    param: Option<(String, Box<TrieNode<T>>)>,
    wildcard: Option<(String, Box<TrieNode<T>>)>,
    methods: HashMap<Method, T>,
}

impl<T> Default for TrieNode<T> {
    fn default() -> Self {
        Self {
            literals: HashMap::new(),
            param: None,
            wildcard: None,
            methods: HashMap::new(),
        }
    }
}

/// The result of resolving a request against a [`Trie`].
#[derive(Debug)]
pub enum MatchOutcome<'a, T> {
    /// No route terminates at the requested path.
    NotFound,
    /// Routes exist for the path, but none for the requested method.
    MethodNotAllowed {
        /// Parameters captured on the way to the node.
        params: PathParams,
        /// Methods registered at the node, sorted by name.
        allowed: Vec<Method>,
    },
    /// A route serves the request.
    Found {
        /// Parameters captured on the way to the node.
        params: PathParams,
        /// The value registered for the method.
        value: &'a T,
    },
}

// ============================================================================
// Builder
// ============================================================================

/// Collects routes before freezing them into a [`Trie`].
pub struct TrieBuilder<T> {
    root: TrieNode<T>,
    len: usize,
}

impl<T> Default for TrieBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TrieBuilder<T> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            root: TrieNode::default(),
            len: 0,
        }
    }

    /// Registers `value` for `method` at the route pattern `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] if the pattern is malformed, if it names a
    /// capture differently from a route already registered at the same
    /// position, or if the same method and path were already registered.
    pub fn insert(&mut self, method: Method, path: &str, value: T) -> Result<(), RouteError> {
        let pattern = path::parse_pattern(path)?;
        let display = display_pattern(&pattern);

        let mut node = &mut self.root;
        for segment in &pattern {
            node = match segment {
                Segment::Literal(lit) => node.literals.entry(lit.clone()).or_default(),
                Segment::Param(name) => descend_capture(&mut node.param, name, &display)?,
                Segment::Wildcard(name) => descend_capture(&mut node.wildcard, name, &display)?,
            };
        }

        if node.methods.contains_key(&method) {
            return Err(RouteError::DuplicateRoute {
                method,
                path: display,
            });
        }
        node.methods.insert(method, value);
        self.len += 1;
        Ok(())
    }

    /// Freezes the builder. No node changes after this point.
    pub fn build(self) -> Trie<T> {
        Trie {
            root: self.root,
            len: self.len,
        }
    }
}

fn descend_capture<'n, T>(
    slot: &'n mut Option<(String, Box<TrieNode<T>>)>,
    name: &str,
    path: &str,
) -> Result<&'n mut TrieNode<T>, RouteError> {
    match slot {
        Some((existing, _)) if existing != name => Err(RouteError::ParamConflict {
            path: path.to_owned(),
            existing: existing.clone(),
            found: name.to_owned(),
        }),
        Some((_, child)) => Ok(child),
        None => {
            let (_, child) = slot.insert((name.to_owned(), Box::default()));
            Ok(child)
        }
    }
}

fn display_pattern(pattern: &[Segment]) -> String {
    let parts: Vec<String> = pattern
        .iter()
        .map(|s| match s {
            Segment::Literal(lit) => lit.clone(),
            Segment::Param(name) => format!(":{name}"),
            Segment::Wildcard(name) if name == path::ANONYMOUS_WILDCARD => "*".to_owned(),
            Segment::Wildcard(name) => format!("*{name}"),
        })
        .collect();
    path::join(&parts)
}

// ============================================================================
// Frozen trie
// ============================================================================

/// An immutable routing trie.
pub struct Trie<T> {
    root: TrieNode<T>,
    len: usize,
}

impl<T> Trie<T> {
    /// Creates a builder.
    pub fn builder() -> TrieBuilder<T> {
        TrieBuilder::new()
    }

    /// Returns the number of registered `(method, path)` pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no route is registered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resolves a request method and path.
    pub fn at(&self, method: &Method, path: &str) -> MatchOutcome<'_, T> {
        let segs: Vec<&str> = path::segments(path).collect();

        let mut captures = Vec::new();
        let serves = |node: &TrieNode<T>| node.methods.contains_key(method);
        if let Some(node) = find(&self.root, &segs, &serves, &mut captures) {
            if let Some(value) = node.methods.get(method) {
                return MatchOutcome::Found {
                    params: collect(captures),
                    value,
                };
            }
        }

        captures.clear();
        let terminates = |node: &TrieNode<T>| !node.methods.is_empty();
        if find(&self.root, &segs, &terminates, &mut captures).is_none() {
            return MatchOutcome::NotFound;
        }

        let mut allowed = Vec::new();
        serving_methods(&self.root, &segs, &mut allowed);
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        allowed.dedup();
        MatchOutcome::MethodNotAllowed {
            params: collect(captures),
            allowed,
        }
    }
}

impl<T> std::fmt::Debug for Trie<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trie").field("routes", &self.len).finish()
    }
}

/// Depth-first search for a node accepted by `accept`.
///
/// On `None` the `captures` vector is left exactly as it was passed in.
fn find<'t, T>(
    node: &'t TrieNode<T>,
    segs: &[&str],
    accept: &dyn Fn(&TrieNode<T>) -> bool,
    captures: &mut Vec<(&'t str, String)>,
) -> Option<&'t TrieNode<T>> {
    let Some((head, rest)) = segs.split_first() else {
        if accept(node) {
            return Some(node);
        }
        // A wildcard also matches an empty remainder.
        if let Some((name, child)) = &node.wildcard {
            if accept(child) {
                captures.push((name.as_str(), String::new()));
                return Some(child);
            }
        }
        return None;
    };

    if let Some(child) = node.literals.get(*head) {
        if let Some(found) = find(child, rest, accept, captures) {
            return Some(found);
        }
    }

    if let Some((name, child)) = &node.param {
        captures.push((name.as_str(), (*head).to_owned()));
        if let Some(found) = find(child, rest, accept, captures) {
            return Some(found);
        }
        captures.pop();
    }

    if let Some((name, child)) = &node.wildcard {
        if accept(child) {
            captures.push((name.as_str(), segs.join("/")));
            return Some(child);
        }
    }

    None
}

/// Gathers the methods of every node that terminates `segs`, across all
/// literal, param and wildcard branches.
fn serving_methods<T>(node: &TrieNode<T>, segs: &[&str], out: &mut Vec<Method>) {
    if let Some((_, child)) = &node.wildcard {
        out.extend(child.methods.keys().cloned());
    }
    let Some((head, rest)) = segs.split_first() else {
        out.extend(node.methods.keys().cloned());
        return;
    };
    if let Some(child) = node.literals.get(*head) {
        serving_methods(child, rest, out);
    }
    if let Some((_, child)) = &node.param {
        serving_methods(child, rest, out);
    }
}

fn collect(captures: Vec<(&str, String)>) -> PathParams {
    captures
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect()
}
