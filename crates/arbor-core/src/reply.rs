//! Replies produced by handlers and middleware.
//!
//! A [`Reply`] is "response-ish": either a finished [`Response`], a JSON value
//! the dispatcher still has to serialize, or nothing at all. Handler return
//! types are converted through [`IntoReply`], so handlers can return whatever
//! is most natural:
//!
//! ```rust,ignore
//! async fn nothing() {}                                  // 200, body `null`
//! async fn value() -> Json<User> { Json(user) }          // 200, JSON body
//! async fn custom() -> Response { text(StatusCode::IM_A_TEAPOT, "tea") }
//! async fn fallible() -> Result<Json<User>, HttpError> { ... }
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::error::HttpError;
use crate::{BoxError, Response};

/// The outcome of a handler or middleware.
#[derive(Debug)]
pub enum Reply {
    /// A finished response; passed through untouched.
    Response(Response),
    /// A value that has not been turned into a response yet.
    Value(Value),
    /// No value was produced.
    Empty,
}

impl Reply {
    /// Returns `true` if this reply already is a response.
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// Returns the response, if this reply carries one.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Response(res) => Some(res),
            _ => None,
        }
    }

    /// Borrows the response, if this reply carries one.
    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Self::Response(res) => Some(res),
            _ => None,
        }
    }
}

impl From<Response> for Reply {
    fn from(res: Response) -> Self {
        Self::Response(res)
    }
}

/// Serializes the wrapped value as a JSON reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

// ============================================================================
// IntoReply
// ============================================================================

/// Conversion of handler and middleware return values into a [`Reply`].
///
/// Conversion may fail (serialization errors, or `Err` values returned by
/// fallible handlers); the error is propagated to the dispatcher like any
/// other handler failure.
pub trait IntoReply {
    /// Performs the conversion.
    fn into_reply(self) -> Result<Reply, BoxError>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(self)
    }
}

impl IntoReply for Response {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::Response(self))
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::Value(self))
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::Empty)
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::Value(Value::String(self)))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::Value(Value::String(self.to_owned())))
    }
}

impl IntoReply for HttpError {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::Response(self.into_response()))
    }
}

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::Value(serde_json::to_value(self.0)?))
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Result<Reply, BoxError> {
        match self {
            Some(inner) => inner.into_reply(),
            None => Ok(Reply::Empty),
        }
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<BoxError>,
{
    fn into_reply(self) -> Result<Reply, BoxError> {
        match self {
            Ok(inner) => inner.into_reply(),
            Err(err) => Err(err.into()),
        }
    }
}
