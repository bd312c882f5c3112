//! Configuration module for the Arbor runtime.
//!
//! Settings are layered with figment (defaults, profile file, main file,
//! `ARBOR_*` environment variables, programmatic overrides) and validated
//! before an application is built from them.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ArborConfig, DispatchConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
