//! # Arbor Runtime
//!
//! Configuration, logging and bootstrap for Arbor applications.
//!
//! - [`config`]: figment-based layered configuration (`arbor.toml`,
//!   profile files, `ARBOR_*` environment variables)
//! - [`logging`]: `tracing-subscriber` setup with optional rotating log files
//! - [`Arbor`]: turns a validated configuration and a route tree into an
//!   [`App`](arbor_framework::App)
//!
//! ```rust,ignore
//! use arbor_runtime::Arbor;
//!
//! let arbor = Arbor::builder().init_logging().build()?;
//! let app = arbor.build(routes())?;
//! let response = app.handle(request).await;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ArborConfig, ConfigError, ConfigLoader, ConfigResult, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, LoggingError, SpanEvents};
pub use runtime::{Arbor, ArborBuilder};

// Re-export tracing for use by applications
pub use tracing;
pub use tracing_subscriber;

/// Logging macros and span helpers.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
