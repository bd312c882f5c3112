//! Request validation.
//!
//! A route may carry a [`ValidateSpec`] with up to four schemas, one per
//! request part. Before the middleware chain runs, each present schema's
//! [`Schema::parse`] is applied to the matching context field and the field
//! is replaced with the parsed output, so later stages see normalized data.
//! The first failure stops validation and is answered with `400 Bad Request`.
//!
//! ```rust,ignore
//! #[derive(Serialize, Deserialize)]
//! struct UserPath { id: u64 }
//!
//! get(show_user)
//!     .at("/users/:id")
//!     .validate(ValidateSpec::new().params(typed::<UserPath>()))
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::context::RequestContext;
use crate::error::{RequestPart, SchemaError, ValidationError};
use crate::lenient::from_value_lenient;

/// A validation schema for one request part.
///
/// Implemented for closures `Fn(Value) -> Result<Value, E>` where `E` is
/// displayable, and for [`Typed`].
pub trait Schema: Send + Sync + 'static {
    /// Checks `input`, returning the (possibly transformed) value to store.
    fn parse(&self, input: Value) -> Result<Value, SchemaError>;
}

impl<F, E> Schema for F
where
    F: Fn(Value) -> Result<Value, E> + Send + Sync + 'static,
    E: fmt::Display,
{
    fn parse(&self, input: Value) -> Result<Value, SchemaError> {
        (self)(input).map_err(|e| SchemaError::new(e.to_string()))
    }
}

/// A schema backed by a serde type.
///
/// The input is deserialized into `T`, coercing strings into numbers and
/// booleans where needed, then serialized back. Fields unknown to `T` are
/// dropped unless `T` keeps them.
pub struct Typed<T> {
    _marker: PhantomData<fn() -> T>,
}

/// Creates a [`Typed`] schema.
pub fn typed<T>() -> Typed<T>
where
    T: DeserializeOwned + Serialize + 'static,
{
    Typed {
        _marker: PhantomData,
    }
}

impl<T> Schema for Typed<T>
where
    T: DeserializeOwned + Serialize + 'static,
{
    fn parse(&self, input: Value) -> Result<Value, SchemaError> {
        let parsed: T = from_value_lenient(input).map_err(|e| SchemaError::new(e.to_string()))?;
        serde_json::to_value(parsed).map_err(|e| SchemaError::new(e.to_string()))
    }
}

/// Schemas to apply to a route's request parts.
#[derive(Clone, Default)]
pub struct ValidateSpec {
    params: Option<Arc<dyn Schema>>,
    body: Option<Arc<dyn Schema>>,
    query: Option<Arc<dyn Schema>>,
    headers: Option<Arc<dyn Schema>>,
}

impl ValidateSpec {
    /// Creates an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the path parameter schema.
    pub fn params<S: Schema>(mut self, schema: S) -> Self {
        self.params = Some(Arc::new(schema));
        self
    }

    /// Sets the body schema.
    ///
    /// A request without a decodable body is validated as `null`.
    pub fn body<S: Schema>(mut self, schema: S) -> Self {
        self.body = Some(Arc::new(schema));
        self
    }

    /// Sets the query schema.
    pub fn query<S: Schema>(mut self, schema: S) -> Self {
        self.query = Some(Arc::new(schema));
        self
    }

    /// Sets the header schema.
    pub fn headers<S: Schema>(mut self, schema: S) -> Self {
        self.headers = Some(Arc::new(schema));
        self
    }

    /// Returns `true` if no schema is set.
    pub fn is_empty(&self) -> bool {
        self.params.is_none()
            && self.body.is_none()
            && self.query.is_none()
            && self.headers.is_none()
    }
}

impl fmt::Debug for ValidateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidateSpec")
            .field("params", &self.params.is_some())
            .field("body", &self.body.is_some())
            .field("query", &self.query.is_some())
            .field("headers", &self.headers.is_some())
            .finish()
    }
}

fn check(part: RequestPart, schema: &dyn Schema, input: Value) -> Result<Value, ValidationError> {
    schema.parse(input).map_err(|source| {
        debug!(part = %part, error = %source, "Validation failed");
        ValidationError { part, source }
    })
}

/// Applies `spec` to the context, replacing each validated field.
///
/// Parts are checked in the order params, body, query, headers.
///
/// # Errors
///
/// Returns the first [`ValidationError`]; fields validated before the
/// failure keep their replaced values.
pub fn validate(ctx: &RequestContext, spec: &ValidateSpec) -> Result<(), ValidationError> {
    if let Some(schema) = &spec.params {
        ctx.set_params(check(RequestPart::Params, schema.as_ref(), ctx.params())?);
    }
    if let Some(schema) = &spec.body {
        let input = ctx.body().unwrap_or(Value::Null);
        let output = check(RequestPart::Body, schema.as_ref(), input)?;
        ctx.set_body((!output.is_null()).then_some(output));
    }
    if let Some(schema) = &spec.query {
        ctx.set_query(check(RequestPart::Query, schema.as_ref(), ctx.query())?);
    }
    if let Some(schema) = &spec.headers {
        ctx.set_headers(check(RequestPart::Headers, schema.as_ref(), ctx.headers())?);
    }
    Ok(())
}
