//! Error types for the Arbor framework.

use std::fmt;

use arbor_core::HttpError;
use http::Method;
use thiserror::Error;

/// Errors detected while compiling a route tree into a trie.
///
/// All of these are configuration mistakes; they are reported once by
/// `App::build` and never at request time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    /// A wildcard segment appears before the end of a route.
    #[error("wildcard must be the last segment in route '{path}'")]
    WildcardNotLast {
        /// The offending route pattern.
        path: String,
    },

    /// A parameter segment has no name (`:`).
    #[error("empty parameter name in route '{path}'")]
    EmptyParamName {
        /// The offending route pattern.
        path: String,
    },

    /// The same parameter name is captured twice by one route.
    #[error("parameter '{name}' is captured twice in route '{path}'")]
    DuplicateParam {
        /// The offending route pattern.
        path: String,
        /// The repeated name.
        name: String,
    },

    /// Two routes use different capture names at the same trie position.
    #[error("route '{path}' names a capture '{found}' where '{existing}' is already registered")]
    ParamConflict {
        /// The route being inserted.
        path: String,
        /// Name already registered at this position.
        existing: String,
        /// Name requested by the new route.
        found: String,
    },

    /// The same method and path were registered twice.
    #[error("route {method} '{path}' is registered more than once")]
    DuplicateRoute {
        /// The method of the duplicate route.
        method: Method,
        /// The normalized path of the duplicate route.
        path: String,
    },
}

/// The request part a schema was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPart {
    /// Path parameters.
    Params,
    /// Parsed request body.
    Body,
    /// Query string.
    Query,
    /// Request headers.
    Headers,
}

impl RequestPart {
    /// Returns the name of the part as used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Params => "params",
            Self::Body => "body",
            Self::Query => "query",
            Self::Headers => "headers",
        }
    }
}

impl fmt::Display for RequestPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by a schema's `parse` when the input is rejected.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SchemaError {
    message: String,
}

impl SchemaError {
    /// Creates a schema error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A request part failed validation.
///
/// The dispatcher answers with `400 Bad Request` and a body of
/// `{"error": "ValidationError", "message": ...}`; the middleware chain is
/// never entered.
#[derive(Debug, Clone, Error)]
#[error("invalid {part}: {source}")]
pub struct ValidationError {
    /// The part that failed.
    pub part: RequestPart,
    /// The schema's failure.
    pub source: SchemaError,
}

/// Violations of the middleware continuation protocol.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// A continuation was invoked after its position had already been reached.
    #[error("next() called multiple times (position {position})")]
    ContinuationReused {
        /// Chain position the continuation tried to dispatch.
        position: usize,
    },
}

/// Errors that can occur during handler argument extraction.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The request has no (parseable) body.
    #[error("request body is missing or could not be parsed")]
    MissingBody,

    /// A per-request extension of the given type was not set.
    #[error("missing request extension '{0}'")]
    MissingExtension(&'static str),

    /// A request part could not be deserialized into the requested type.
    #[error("failed to deserialize {part}: {message}")]
    Deserialize {
        /// The part being extracted.
        part: RequestPart,
        /// The deserializer's message.
        message: String,
    },

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a custom extraction error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub(crate) fn deserialize(part: RequestPart, err: serde_json::Error) -> Self {
        Self::Deserialize {
            part,
            message: err.to_string(),
        }
    }
}

impl From<ExtractError> for HttpError {
    fn from(err: ExtractError) -> Self {
        match err {
            // A missing extension is a wiring mistake, not the client's fault.
            ExtractError::MissingExtension(_) => {
                HttpError::new(http::StatusCode::INTERNAL_SERVER_ERROR)
            }
            other => HttpError::bad_request().detail(other.to_string()),
        }
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;
