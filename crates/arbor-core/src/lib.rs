//! # Arbor Core
//!
//! Protocol-level value types shared by every Arbor crate.
//!
//! This crate knows nothing about routing or middleware. It provides:
//!
//! - **Request/Response aliases** over the [`http`] crate with buffered
//!   [`Bytes`](bytes::Bytes) bodies ([`Request`], [`Response`])
//! - **Replies**: the "response-ish" value produced by handlers and middleware
//!   ([`Reply`], [`IntoReply`], [`Json`])
//! - **Response helpers**: JSON, plain text and empty responses ([`ResponseInit`])
//! - **Problem Details**: a self-describing HTTP error ([`HttpError`])
//! - **Body parsing**: content-type driven body, query and header decoding
//!
//! ```text
//! ┌───────────┐     ┌──────────────┐     ┌─────────────┐
//! │ Transport │────▶│  arbor App   │────▶│  Handlers   │
//! │ (adapter) │◀────│ (framework)  │◀────│  (Reply)    │
//! └───────────┘     └──────────────┘     └─────────────┘
//! ```

pub mod body;
pub mod error;
pub mod reply;
pub mod response;

pub use body::{headers_to_value, media_type, parse_body, parse_query};
pub use error::{BodyError, HttpError};
pub use reply::{IntoReply, Json, Reply};
pub use response::{ResponseInit, empty, json_response, text};

/// A type-erased error that can cross task and crate boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An HTTP request with a fully buffered body.
///
/// Transport adapters are expected to collect the body before handing the
/// request to an application.
pub type Request = http::Request<bytes::Bytes>;

/// An HTTP response with a fully buffered body.
pub type Response = http::Response<bytes::Bytes>;
