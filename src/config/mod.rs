// Configuration module entry point
// Loads layered configuration and resolves the listener address and document root

mod types;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::ServerError;

pub use types::{AccessLogFormat, Config, HttpConfig, LoggingConfig, ServerConfig};

/// Optional configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "coi-serve.toml";

/// Prefix for environment overrides, e.g. `COI_SERVE_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "COI_SERVE";

/// `COI_SERVE_` prefix, `__` between nested keys
fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

impl ServerConfig {
    /// Worker thread count for the runtime; `None` (or 0) means one per core
    pub fn worker_threads(&self) -> Option<usize> {
        self.workers.filter(|&n| n > 0)
    }
}

impl Config {
    /// Load configuration from `coi-serve.toml` (if present) and the environment
    pub fn load() -> Result<Self, ServerError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error: the defaults reproduce the stock
    /// behaviour (`0.0.0.0:8888`, serving the working directory).
    pub fn load_from(config_path: &Path) -> Result<Self, ServerError> {
        Self::load_layered(config_path, env_source())
    }

    fn load_layered(
        config_path: &Path,
        env: config::Environment,
    ) -> Result<Self, ServerError> {
        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8888)?
            .set_default("server.root", ".")?
            .set_default(
                "http.server_name",
                concat!("coi-serve/", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("http.index_files", vec!["index.html", "index.htm"])?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .add_source(config::File::from(config_path).required(false))
            .add_source(env)
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| ServerError::InvalidAddress { addr, source })
    }

    /// Canonical document root; fails if it is missing or not a directory
    pub fn resolve_root(&self) -> Result<PathBuf, ServerError> {
        let root = &self.server.root;
        let canonical = root.canonicalize().map_err(|source| ServerError::Root {
            path: root.clone(),
            source,
        })?;
        if canonical.is_dir() {
            Ok(canonical)
        } else {
            Err(ServerError::Root {
                path: root.clone(),
                source: std::io::Error::other("not a directory"),
            })
        }
    }
}
