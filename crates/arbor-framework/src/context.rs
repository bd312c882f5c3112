//! Per-request context.
//!
//! A [`RequestContext`] is created for every matched request and shared by
//! the validator, every middleware in the chain and the terminal handler
//! through a [`Context`] (`Arc<RequestContext>`). The decoded request parts
//! are stored as [`serde_json::Value`]s behind locks, so validation can
//! replace them in place and middleware can enrich them for later stages.
//!
//! - **Decoded parts**: `params`, `body`, `query` and `headers`
//! - **Original request**: method, URI, raw headers and raw body bytes
//! - **Response slot**: a response recorded by middleware, used when the
//!   chain itself produces no response
//! - **Extensions**: typed per-request values (an authenticated user, a
//!   request id) shared between middleware and handlers

use std::any::type_name;
use std::sync::Arc;

use http::{Extensions, HeaderMap, Method, Uri};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Map, Value};

use arbor_core::{
    BodyError, Request, ResponseInit, Response, headers_to_value, json_response, parse_body,
    parse_query,
};

use crate::dispatcher::DispatchOptions;
use crate::error::{ExtractError, ExtractResult};

/// A shared handle to the context of one request.
pub type Context = Arc<RequestContext>;

/// Everything known about one request while it is being dispatched.
pub struct RequestContext {
    request: Request,
    params: RwLock<Value>,
    body: RwLock<Option<Value>>,
    query: RwLock<Value>,
    headers: RwLock<Value>,
    response: Mutex<Option<Response>>,
    extensions: Mutex<Extensions>,
}

impl RequestContext {
    /// Decodes a request without a body size limit.
    pub fn new(request: Request) -> Self {
        let body = parse_body(request.method(), request.headers(), request.body());
        let query = parse_query(request.uri().query());
        let headers = headers_to_value(request.headers());

        Self {
            request,
            params: RwLock::new(Value::Object(Map::new())),
            body: RwLock::new(body),
            query: RwLock::new(query),
            headers: RwLock::new(headers),
            response: Mutex::new(None),
            extensions: Mutex::new(Extensions::new()),
        }
    }

    /// Decodes a request, enforcing the configured body size limit.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::TooLarge`] if the body exceeds
    /// `options.max_body_bytes`.
    pub fn from_request(request: Request, options: &DispatchOptions) -> Result<Self, BodyError> {
        if let Some(limit) = options.max_body_bytes {
            let actual = request.body().len();
            if actual > limit {
                return Err(BodyError::TooLarge { limit, actual });
            }
        }
        Ok(Self::new(request))
    }

    // ------------------------------------------------------------------------
    // Original request
    // ------------------------------------------------------------------------

    /// Returns the original request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Returns the request URI.
    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    /// Returns the raw request headers.
    pub fn raw_headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    // ------------------------------------------------------------------------
    // Decoded parts
    // ------------------------------------------------------------------------

    /// Returns the path parameters as an object.
    pub fn params(&self) -> Value {
        self.params.read().clone()
    }

    /// Returns one path parameter as a string.
    pub fn param(&self, name: &str) -> Option<String> {
        match self.params.read().get(name)? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Replaces the path parameters.
    pub fn set_params(&self, params: Value) {
        *self.params.write() = params;
    }

    /// Returns the parsed body, if the request had one.
    pub fn body(&self) -> Option<Value> {
        self.body.read().clone()
    }

    /// Replaces the parsed body.
    pub fn set_body(&self, body: Option<Value>) {
        *self.body.write() = body;
    }

    /// Returns the query parameters as an object.
    pub fn query(&self) -> Value {
        self.query.read().clone()
    }

    /// Replaces the query parameters.
    pub fn set_query(&self, query: Value) {
        *self.query.write() = query;
    }

    /// Returns the headers as an object keyed by lower-case name.
    pub fn headers(&self) -> Value {
        self.headers.read().clone()
    }

    /// Replaces the decoded headers. The raw headers are left untouched.
    pub fn set_headers(&self, headers: Value) {
        *self.headers.write() = headers;
    }

    // ------------------------------------------------------------------------
    // Responses
    // ------------------------------------------------------------------------

    /// Serializes `value` into a JSON response.
    ///
    /// `content-type: application/json` is set unless `init` carries a
    /// content type of its own.
    pub fn json<T>(
        &self,
        value: &T,
        init: impl Into<ResponseInit>,
    ) -> Result<Response, serde_json::Error>
    where
        T: Serialize + ?Sized,
    {
        json_response(value, init)
    }

    /// Records a response to be sent if the chain produces no response.
    pub fn set_response(&self, response: Response) {
        *self.response.lock() = Some(response);
    }

    /// Takes the recorded response.
    pub fn take_response(&self) -> Option<Response> {
        self.response.lock().take()
    }

    /// Returns `true` if a response has been recorded.
    pub fn has_response(&self) -> bool {
        self.response.lock().is_some()
    }

    // ------------------------------------------------------------------------
    // Extensions
    // ------------------------------------------------------------------------

    /// Stores a typed value for later stages, returning the previous one.
    pub fn insert_extension<T>(&self, value: T) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.lock().insert(value)
    }

    /// Returns a clone of a stored value.
    pub fn extension<T>(&self) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.lock().get::<T>().cloned()
    }

    /// Returns a clone of a stored value, or an extraction error.
    pub fn require_extension<T>(&self) -> ExtractResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extension::<T>()
            .ok_or(ExtractError::MissingExtension(type_name::<T>()))
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", self.method())
            .field("uri", self.uri())
            .field("params", &*self.params.read())
            .field("has_response", &self.has_response())
            .finish_non_exhaustive()
    }
}
