//! Runtime error types.

use thiserror::Error;

use arbor_framework::RouteError;

use crate::config::ConfigError;
use crate::logging::LoggingError;

/// Errors raised while bootstrapping an application.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The subscriber could not be installed.
    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// The route tree was rejected.
    #[error("Invalid route tree: {0}")]
    Route(#[from] RouteError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
