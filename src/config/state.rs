// Application state module
// Shared, read-only state handed to every connection

use hyper::header::HeaderValue;
use std::path::PathBuf;

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Served root, made absolute once at startup
    pub root: PathBuf,
    /// Pre-built `Server` header, `None` if the configured name is not a valid header value
    pub server_header: Option<HeaderValue>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let root = std::path::absolute(&config.server.root)
            .unwrap_or_else(|_| config.server.root.clone());
        let server_header = HeaderValue::from_str(&config.http.server_name).ok();
        Self {
            config,
            root,
            server_header,
        }
    }
}
