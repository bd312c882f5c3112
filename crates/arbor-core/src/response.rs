//! Response construction helpers.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use serde::Serialize;

use crate::Response;

/// Media type set by the JSON helpers.
pub const APPLICATION_JSON: &str = "application/json";

/// Status and headers for a response built by a helper.
///
/// Anything accepting `impl Into<ResponseInit>` also accepts a bare
/// [`StatusCode`].
///
/// ```rust,ignore
/// ctx.json(&user, StatusCode::CREATED)?;
/// ctx.json(&user, ResponseInit::new().header(LOCATION, HeaderValue::from_static("/users/7")))?;
/// ```
#[derive(Debug, Clone)]
pub struct ResponseInit {
    /// Status code of the response (default `200 OK`).
    pub status: StatusCode,
    /// Headers copied onto the response.
    pub headers: HeaderMap,
}

impl Default for ResponseInit {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseInit {
    /// Creates an init with status 200 and no headers.
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }

    /// Sets the status code.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Appends a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }
}

impl From<StatusCode> for ResponseInit {
    fn from(status: StatusCode) -> Self {
        Self::new().status(status)
    }
}

fn build(body: Bytes, init: ResponseInit) -> Response {
    let mut res = Response::new(body);
    *res.status_mut() = init.status;
    *res.headers_mut() = init.headers;
    res
}

/// Serializes `value` as JSON.
///
/// `content-type` is set to `application/json` unless `init` already
/// carries one.
pub fn json_response<T>(
    value: &T,
    init: impl Into<ResponseInit>,
) -> Result<Response, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec(value)?;
    let mut res = build(Bytes::from(bytes), init.into());
    if !res.headers().contains_key(CONTENT_TYPE) {
        res.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    }
    Ok(res)
}

/// Builds a `text/plain` response.
pub fn text(status: StatusCode, body: impl Into<String>) -> Response {
    let mut res = build(Bytes::from(body.into()), status.into());
    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    res
}

/// Builds a response with no body and no content type.
pub fn empty(status: StatusCode) -> Response {
    build(Bytes::new(), status.into())
}
