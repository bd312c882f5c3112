//! Extractor system for handler arguments.
//!
//! Handler functions declare what they need as parameters; every parameter
//! type implements [`FromContext`] and is extracted from the request context
//! before the handler runs.
//!
//! ```rust,ignore
//! #[derive(Deserialize)]
//! struct UserPath { id: u64 }
//!
//! async fn show(Params(path): Params<UserPath>, Query(q): Query<Paging>) -> Json<User> {
//!     // ...
//! }
//! ```
//!
//! # Error Handling
//!
//! A failed extraction aborts the handler. The [`ExtractError`] is converted
//! into an [`HttpError`](arbor_core::HttpError) and reported to the client as
//! `400 Bad Request` (or `500` for a missing extension, which is a wiring
//! mistake). Optional extractors with [`Option<T>`] never fail.
//!
//! # String coercion
//!
//! [`Params`], [`Query`] and [`Headers`] deserialize with string coercion, so
//! `/users/42` extracts into `Params<u64>` as well as into a struct with a
//! numeric `id` field. A scalar `T` is read from the single captured value.

use std::ops::{Deref, DerefMut};

use http::{HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::Context;
use crate::error::{ExtractError, ExtractResult, RequestPart};
use crate::lenient::from_value_lenient;

/// A trait for types that can be extracted from a request [`Context`].
pub trait FromContext: Sized {
    /// Attempts to extract this type from the given context.
    fn from_context(ctx: &Context) -> ExtractResult<Self>;
}

impl FromContext for Context {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        Ok(ctx.clone())
    }
}

impl<T: FromContext> FromContext for Option<T> {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).ok())
    }
}

impl FromContext for Method {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        Ok(ctx.method().clone())
    }
}

impl FromContext for Uri {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        Ok(ctx.uri().clone())
    }
}

impl FromContext for HeaderMap {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        Ok(ctx.raw_headers().clone())
    }
}

/// Deserializes a decoded part, reading a scalar `T` from a one-entry object.
fn from_part<T: DeserializeOwned>(part: RequestPart, value: Value) -> ExtractResult<T> {
    match from_value_lenient::<T>(value.clone()) {
        Ok(v) => Ok(v),
        Err(err) => match value {
            Value::Object(map) if map.len() == 1 => map
                .into_iter()
                .next()
                .map(|(_, single)| from_value_lenient::<T>(single))
                .ok_or_else(|| ExtractError::deserialize(part, err))?
                .map_err(|e| ExtractError::deserialize(part, e)),
            _ => Err(ExtractError::deserialize(part, err)),
        },
    }
}

macro_rules! decoded_extractor {
    ($(#[$doc:meta])* $name:ident, $part:expr, $read:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name<T>(pub T);

        impl<T: DeserializeOwned> FromContext for $name<T> {
            fn from_context(ctx: &Context) -> ExtractResult<Self> {
                from_part($part, ctx.$read()).map($name)
            }
        }

        impl<T> Deref for $name<T> {
            type Target = T;

            fn deref(&self) -> &T {
                &self.0
            }
        }

        impl<T> DerefMut for $name<T> {
            fn deref_mut(&mut self) -> &mut T {
                &mut self.0
            }
        }
    };
}

decoded_extractor!(
    /// Path parameters captured by the route.
    Params,
    RequestPart::Params,
    params
);

decoded_extractor!(
    /// The decoded query string.
    Query,
    RequestPart::Query,
    query
);

decoded_extractor!(
    /// Request headers, keyed by lower-case name.
    Headers,
    RequestPart::Headers,
    headers
);

/// The parsed request body.
///
/// Fails with [`ExtractError::MissingBody`] if the request had no body or
/// its content type could not be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Body<T>(pub T);

impl<T: DeserializeOwned> FromContext for Body<T> {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        let value = ctx.body().ok_or(ExtractError::MissingBody)?;
        from_value_lenient(value)
            .map(Body)
            .map_err(|e| ExtractError::deserialize(RequestPart::Body, e))
    }
}

impl<T> Deref for Body<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// A typed value stored on the context by an earlier middleware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extension<T>(pub T);

impl<T> FromContext for Extension<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        ctx.require_extension::<T>().map(Extension)
    }
}

impl<T> Deref for Extension<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::RequestContext;
    use bytes::Bytes;
    use serde::Deserialize;
    use serde_json::json;

    fn ctx(method: Method, uri: &str, body: &'static str) -> Context {
        let req = http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap();
        Arc::new(RequestContext::new(req))
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct UserPath {
        id: u64,
    }

    #[test]
    fn test_params() {
        let ctx = ctx(Method::GET, "/users/42", "");
        ctx.set_params(json!({"id": "42"}));

        let Params(path) = Params::<UserPath>::from_context(&ctx).unwrap();
        assert_eq!(path, UserPath { id: 42 });

        let Params(id) = Params::<u64>::from_context(&ctx).unwrap();
        assert_eq!(id, 42);

        let Params(raw) = Params::<String>::from_context(&ctx).unwrap();
        assert_eq!(raw, "42");
    }

    #[test]
    fn test_params_rejects_non_numeric() {
        let ctx = ctx(Method::GET, "/users/abc", "");
        ctx.set_params(json!({"id": "abc"}));
        let err = Params::<UserPath>::from_context(&ctx).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Deserialize {
                part: RequestPart::Params,
                ..
            }
        ));
    }

    #[test]
    fn test_query_and_body() {
        #[derive(Debug, Deserialize)]
        struct Paging {
            page: u32,
            #[serde(default)]
            sort: Vec<String>,
        }
        #[derive(Debug, Deserialize)]
        struct NewUser {
            name: String,
        }

        let ctx = ctx(Method::POST, "/users?page=3&sort=name", r#"{"name":"ada"}"#);
        let Query(paging) = Query::<Paging>::from_context(&ctx).unwrap();
        assert_eq!(paging.page, 3);
        assert_eq!(paging.sort, vec!["name"]);

        let body = Body::<NewUser>::from_context(&ctx).unwrap();
        assert_eq!(body.name, "ada");
    }

    #[test]
    fn test_missing_body() {
        let ctx = ctx(Method::GET, "/", "");
        assert!(matches!(
            Body::<Value>::from_context(&ctx),
            Err(ExtractError::MissingBody)
        ));
        assert!(Option::<Body<Value>>::from_context(&ctx).unwrap().is_none());
    }

    #[test]
    fn test_extension() {
        let ctx = ctx(Method::GET, "/", "");
        assert!(matches!(
            Extension::<u32>::from_context(&ctx),
            Err(ExtractError::MissingExtension(_))
        ));
        ctx.insert_extension(7u32);
        assert_eq!(*Extension::<u32>::from_context(&ctx).unwrap(), 7);
    }
}
