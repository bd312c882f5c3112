//! Application bootstrap.
//!
//! [`Arbor`] holds a validated configuration and turns route trees into
//! [`App`]s with the configured dispatch options.
//!
//! ```rust,ignore
//! use arbor_runtime::Arbor;
//! use arbor_framework::{get, router};
//!
//! // Loads arbor.toml and ARBOR_* variables, then installs the subscriber
//! let arbor = Arbor::builder().profile("production").init_logging().build()?;
//! let app = arbor.build(router("/api", [get(health).at("health")]))?;
//! ```

use tracing::debug;

use arbor_framework::{App, DispatchOptions, Node};

use crate::config::{ArborConfig, ConfigLoader, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// A configured Arbor runtime.
#[derive(Debug, Clone, Default)]
pub struct Arbor {
    config: ArborConfig,
}

impl Arbor {
    /// Creates a runtime with built-in defaults and no file or environment
    /// lookups.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder that loads configuration from files and the
    /// environment.
    pub fn builder() -> ArborBuilder {
        ArborBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    pub fn from_config(config: ArborConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ArborConfig {
        &self.config
    }

    /// Installs the global subscriber from the logging configuration.
    pub fn init_logging(&self) -> RuntimeResult<()> {
        logging::init_from_config(&self.config.logging)?;
        Ok(())
    }

    /// Returns the dispatch options derived from the configuration.
    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions::from(&self.config.dispatch)
    }

    /// Compiles a route tree into an application.
    pub fn build(&self, root: Node) -> RuntimeResult<App> {
        let app = App::with_options(root, self.dispatch_options())?;
        debug!(
            routes = app.route_count(),
            scopes = app.middleware_index().len(),
            max_body_bytes = self.config.dispatch.max_body_bytes,
            "Application built"
        );
        Ok(app)
    }
}

/// Builder for [`Arbor`].
pub struct ArborBuilder {
    loader: ConfigLoader,
    init_logging: bool,
}

impl Default for ArborBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArborBuilder {
    /// Creates a builder using the default configuration search.
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
            init_logging: false,
        }
    }

    /// Loads a specific configuration file instead of searching.
    pub fn config_file(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    /// Adds a directory to search for `arbor.toml`.
    pub fn search_path(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.loader = self.loader.search_path(path);
        self
    }

    /// Selects the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    /// Ignores `ARBOR_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Merges a configuration over every loaded source.
    pub fn merge(mut self, config: ArborConfig) -> Self {
        self.loader = self.loader.merge(config);
        self
    }

    /// Installs the global subscriber as part of [`build`](Self::build).
    pub fn init_logging(mut self) -> Self {
        self.init_logging = true;
        self
    }

    /// Loads, validates and applies the configuration.
    pub fn build(self) -> RuntimeResult<Arbor> {
        let arbor = Arbor::from_config(self.loader.load()?)?;
        if self.init_logging {
            arbor.init_logging()?;
        }
        debug!(config = ?arbor.config, "Runtime configured");
        Ok(arbor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RuntimeError;
    use arbor_framework::{get, post, router};
    use bytes::Bytes;
    use figment::Jail;
    use http::{Method, StatusCode, header::ALLOW};

    fn request(method: Method, uri: &str, body: &'static [u8]) -> http::Request<Bytes> {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::from_static(body))
            .unwrap()
    }

    async fn ok() -> &'static str {
        "ok"
    }

    fn tree() -> Node {
        router("/api", [get(ok).at("items"), post(ok).at("items")])
    }

    #[tokio::test]
    async fn test_dispatch_config_reaches_app() {
        let mut config = ArborConfig::default();
        config.dispatch.max_body_bytes = 4;
        config.dispatch.allow_header = false;
        let app = Arbor::from_config(config).unwrap().build(tree()).unwrap();

        let res = app.handle(request(Method::POST, "/api/items", b"12345")).await;
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let res = app.handle(request(Method::DELETE, "/api/items", b"")).await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(res.headers().get(ALLOW).is_none());
    }

    #[tokio::test]
    async fn test_default_runtime() {
        let app = Arbor::new().build(tree()).unwrap();
        assert_eq!(app.route_count(), 2);

        let res = app.handle(request(Method::DELETE, "/api/items", b"")).await;
        assert_eq!(res.headers()[ALLOW], "GET, POST");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = ArborConfig::default();
        config.dispatch.max_body_bytes = 0;
        assert!(matches!(
            Arbor::from_config(config),
            Err(RuntimeError::Config(_))
        ));
    }

    #[test]
    fn test_route_errors_surface() {
        let result = Arbor::new().build(router("/", [get(ok).at("a/*/b")]));
        assert!(matches!(result, Err(RuntimeError::Route(_))));
    }

    #[test]
    fn test_builder_loads_files() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "arbor.toml",
                r#"
                [dispatch]
                max_body_bytes = 128
                "#,
            )?;
            let arbor = Arbor::builder()
                .search_path(jail.directory())
                .build()
                .map_err(|e| e.to_string())?;
            assert_eq!(arbor.dispatch_options().max_body_bytes, Some(128));
            Ok(())
        });
    }
}
