// Configuration module entry point
// Layers defaults, an optional config file, environment and command line

mod state;
mod types;

use std::net::SocketAddr;

use crate::cli::Cli;
use crate::error::ServerError;

pub use state::AppState;
pub use types::{
    AccessLogFormat, Config, HttpConfig, LogLevel, LoggingConfig, PerformanceConfig, ServerConfig,
};

/// Config file looked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "nocache.toml";
pub const DEFAULT_PORT: u16 = 8000;

impl Config {
    /// Load configuration for the binary: defaults, optional file,
    /// `NOCACHE_*` environment variables, then command line overrides.
    pub fn load(cli: &Cli) -> Result<Self, ServerError> {
        let (path, required) = match cli.config.as_deref() {
            Some(p) => (p, true),
            None => (DEFAULT_CONFIG_FILE, false),
        };

        let settings = defaults(config::Config::builder())?
            .add_source(config::File::with_name(path).required(required))
            .add_source(
                config::Environment::with_prefix("NOCACHE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("server.port", cli.port.map(i64::from))?
            .set_override_option("server.host", cli.bind.clone())?
            .set_override_option(
                "server.root",
                cli.directory.as_ref().map(|d| d.display().to_string()),
            )?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Built-in defaults only, no file or environment lookup
    pub fn load_defaults() -> Result<Self, ServerError> {
        let settings = defaults(config::Config::builder())?.build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = if self.server.host.contains(':') && !self.server.host.starts_with('[') {
            format!("[{}]:{}", self.server.host, self.server.port)
        } else {
            format!("{}:{}", self.server.host, self.server.port)
        };
        addr.parse()
            .map_err(|source| ServerError::InvalidAddress { addr, source })
    }
}

fn defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", i64::from(DEFAULT_PORT))?
        .set_default("server.root", ".")?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("logging.access_log_format", "common")?
        .set_default("performance.keep_alive", true)?
        .set_default("performance.connection_timeout", 0)?
        .set_default(
            "http.server_name",
            concat!("NoCacheHTTP/", env!("CARGO_PKG_VERSION")),
        )?
        .set_default("http.index_files", vec!["index.html", "index.htm"])
}
