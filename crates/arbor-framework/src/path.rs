//! Path normalization and route pattern parsing.
//!
//! Both route patterns and request paths go through [`segments`], so
//! `//a///b/`, `/a/b` and `a/b` are the same path.

use std::collections::HashSet;

use crate::error::RouteError;

/// Capture name used for an anonymous `*` wildcard.
pub const ANONYMOUS_WILDCARD: &str = "*";

/// One component of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches exactly this string.
    Literal(String),
    /// `:name`, captures one path component.
    Param(String),
    /// `*` or `*name`, captures every remaining component.
    Wildcard(String),
}

/// Splits a path on `/`, dropping empty components.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Joins normalized components back into an absolute path.
pub fn join<S: AsRef<str>>(parts: &[S]) -> String {
    let mut out = String::from("/");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push('/');
        }
        out.push_str(part.as_ref());
    }
    out
}

/// Parses a route pattern into segments.
///
/// # Errors
///
/// Fails if a wildcard is not the final segment, a parameter is unnamed, or
/// one name is captured twice.
pub fn parse_pattern(path: &str) -> Result<Vec<Segment>, RouteError> {
    let raw: Vec<&str> = segments(path).collect();
    let mut parsed = Vec::with_capacity(raw.len());
    let mut names = HashSet::new();

    for (i, part) in raw.iter().enumerate() {
        let segment = if let Some(name) = part.strip_prefix(':') {
            if name.is_empty() {
                return Err(RouteError::EmptyParamName { path: join(&raw) });
            }
            Segment::Param(name.to_owned())
        } else if let Some(name) = part.strip_prefix('*') {
            if i + 1 != raw.len() {
                return Err(RouteError::WildcardNotLast { path: join(&raw) });
            }
            let name = if name.is_empty() {
                ANONYMOUS_WILDCARD
            } else {
                name
            };
            Segment::Wildcard(name.to_owned())
        } else {
            Segment::Literal((*part).to_owned())
        };

        if let Segment::Param(name) | Segment::Wildcard(name) = &segment {
            if !names.insert(name.clone()) {
                return Err(RouteError::DuplicateParam {
                    path: join(&raw),
                    name: name.clone(),
                });
            }
        }
        parsed.push(segment);
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_is_idempotent() {
        let a: Vec<_> = segments("/a/b").collect();
        let b: Vec<_> = segments("//a//b//").collect();
        let c: Vec<_> = segments("a/b/").collect();
        assert_eq!(a, vec!["a", "b"]);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(join(&a), "/a/b");
        assert_eq!(join::<&str>(&[]), "/");
    }

    #[test]
    fn test_parse_pattern() {
        assert_eq!(
            parse_pattern("/users/:id/files/*path").unwrap(),
            vec![
                Segment::Literal("users".into()),
                Segment::Param("id".into()),
                Segment::Literal("files".into()),
                Segment::Wildcard("path".into()),
            ]
        );
        assert_eq!(
            parse_pattern("/static/*").unwrap().last(),
            Some(&Segment::Wildcard("*".into()))
        );
    }

    #[test]
    fn test_interior_wildcard_rejected() {
        assert_eq!(
            parse_pattern("/a/*/b"),
            Err(RouteError::WildcardNotLast {
                path: "/a/*/b".into()
            })
        );
    }

    #[test]
    fn test_bad_params_rejected() {
        assert!(matches!(
            parse_pattern("/a/:"),
            Err(RouteError::EmptyParamName { .. })
        ));
        assert!(matches!(
            parse_pattern("/:id/x/:id"),
            Err(RouteError::DuplicateParam { name, .. }) if name == "id"
        ));
    }
}
