//! Unified error types for the Arbor core.
//!
//! Framework-level errors (routing, validation, continuation misuse) are
//! defined in `arbor-framework`.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::Response;

/// Media type used for Problem Details bodies (RFC 7807).
pub const PROBLEM_JSON: &str = "application/problem+json";

// =============================================================================
// Problem Details
// =============================================================================

/// A structured HTTP error carrying RFC 7807 Problem Details fields.
///
/// When a handler or middleware fails with an `HttpError`, the dispatcher
/// converts it into an `application/problem+json` response with the declared
/// status instead of a generic 500.
///
/// # Example
///
/// ```rust,ignore
/// async fn show(Params(id): Params<u64>) -> Result<Json<User>, HttpError> {
///     let user = find(id).ok_or_else(|| HttpError::not_found().detail("no such user"))?;
///     Ok(Json(user))
/// }
/// ```
#[derive(Debug, Clone, Error)]
#[error("{status}: {}", .detail.as_deref().unwrap_or("request failed"))]
pub struct HttpError {
    status: StatusCode,
    title: Option<String>,
    detail: Option<String>,
    type_uri: Option<String>,
    instance: Option<String>,
}

#[derive(Serialize)]
struct ProblemBody<'a> {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    type_uri: Option<&'a str>,
    title: &'a str,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance: Option<&'a str>,
}

impl HttpError {
    /// Creates an error with the given status and no further details.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            title: None,
            detail: None,
            type_uri: None,
            instance: None,
        }
    }

    /// 400 Bad Request.
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST)
    }

    /// 401 Unauthorized.
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED)
    }

    /// 403 Forbidden.
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN)
    }

    /// 404 Not Found.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// 409 Conflict.
    pub fn conflict() -> Self {
        Self::new(StatusCode::CONFLICT)
    }

    /// 413 Payload Too Large.
    pub fn payload_too_large() -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE)
    }

    /// 422 Unprocessable Entity.
    pub fn unprocessable() -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY)
    }

    /// Returns the short, human-readable summary.
    pub fn title(&self) -> &str {
        self.title
            .as_deref()
            .or_else(|| self.status.canonical_reason())
            .unwrap_or("Error")
    }

    /// Overrides the title (defaults to the status' canonical reason).
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the occurrence-specific explanation.
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Sets the URI identifying the problem type.
    pub fn with_type(mut self, type_uri: impl Into<String>) -> Self {
        self.type_uri = Some(type_uri.into());
        self
    }

    /// Sets the URI identifying this occurrence.
    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Returns the HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the detail message, if any.
    pub fn get_detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Converts this error into an `application/problem+json` response.
    pub fn into_response(self) -> Response {
        let body = ProblemBody {
            type_uri: self.type_uri.as_deref(),
            title: self.title(),
            status: self.status.as_u16(),
            detail: self.detail.as_deref(),
            instance: self.instance.as_deref(),
        };
        // Only string and integer fields: serialization cannot fail.
        let bytes = serde_json::to_vec(&body).unwrap_or_default();

        let mut res = Response::new(Bytes::from(bytes));
        *res.status_mut() = self.status;
        res.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
        res
    }
}

// =============================================================================
// Body Errors
// =============================================================================

/// Errors that can occur while reading a request body.
#[derive(Debug, Clone, Error)]
pub enum BodyError {
    /// The body exceeds the configured limit.
    #[error("request body of {actual} bytes exceeds the limit of {limit} bytes")]
    TooLarge {
        /// Configured maximum in bytes.
        limit: usize,
        /// Actual body length in bytes.
        actual: usize,
    },
}

impl From<BodyError> for HttpError {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::TooLarge { .. } => HttpError::payload_too_large().detail(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_problem_response_shape() {
        let res = HttpError::not_found()
            .detail("user 7 does not exist")
            .instance("/users/7")
            .into_response();

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.headers()[CONTENT_TYPE], PROBLEM_JSON);

        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["status"], 404);
        assert_eq!(body["title"], "Not Found");
        assert_eq!(body["detail"], "user 7 does not exist");
        assert_eq!(body["instance"], "/users/7");
        assert!(body.get("type").is_none());
    }

    #[test]
    fn test_custom_title_and_type() {
        let err = HttpError::new(StatusCode::IM_A_TEAPOT)
            .with_title("Short and stout")
            .with_type("https://example.com/probs/teapot");

        assert_eq!(err.title(), "Short and stout");
        let body: Value = serde_json::from_slice(err.into_response().body()).unwrap();
        assert_eq!(body["type"], "https://example.com/probs/teapot");
        assert_eq!(body["status"], 418);
    }

    #[test]
    fn test_body_error_maps_to_413() {
        let err: HttpError = BodyError::TooLarge {
            limit: 4,
            actual: 10,
        }
        .into();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(err.get_detail().unwrap().contains("10 bytes"));
    }
}
