//! Development static file server that disables HTTP caching.
//!
//! Serves a directory over HTTP/1.x the way a plain static file server would
//! (files, index files, directory listings, 404s) and decorates every
//! response with `Cache-Control`, `Pragma` and `Expires` headers so browsers
//! always re-fetch.
//!
//! ```no_run
//! use std::sync::Arc;
//! use nocache_server::config::{AppState, Config};
//! use nocache_server::server::Server;
//!
//! # async fn demo() -> Result<(), nocache_server::error::ServerError> {
//! let config = Config::load_defaults()?;
//! let server = Server::bind(Arc::new(AppState::new(config)))?;
//! server.run().await;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod nocache;
pub mod server;

pub use error::ServerError;
pub use nocache::NoCache;
pub use server::Server;
