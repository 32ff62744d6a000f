//! Startup error types
//!
//! Request-level failures never surface here: the handler turns them into
//! HTTP error responses. Everything in this enum is fatal before serving.

use std::io;
use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("failed to open log file: {0}")]
    Logger(io::Error),

    #[error("failed to start runtime: {0}")]
    Runtime(io::Error),
}

impl ServerError {
    /// True when the error came from binding the listening socket.
    pub const fn is_bind(&self) -> bool {
        matches!(self, Self::Bind { .. })
    }
}
