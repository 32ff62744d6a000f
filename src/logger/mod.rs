//! Logger module
//!
//! Provides logging utilities for the server:
//! - the startup announcement on stdout
//! - access logging in several formats
//! - error and warning logging, filtered by level
//!
//! Before `init()` runs (unit and integration tests), everything goes to
//! stderr at `info` level.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::{AccessLogFormat, AppState, Config, LogLevel};
use crate::error::ServerError;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> Result<(), ServerError> {
    writer::init(
        config.logging.level,
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
    .map_err(ServerError::Logger)
}

fn enabled(level: LogLevel) -> bool {
    writer::get().map_or(LogLevel::Info, writer::LogWriter::level) >= level
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

/// Write to access log
fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => eprintln!("{message}"),
    }
}

/// Announce the listening port on stdout, then log details to the error log
pub fn log_server_start(port: u16, state: &AppState) {
    println!("Serving at http://localhost:{port} with no-cache headers");
    log_info(&format!(
        "Binding {}:{port}, serving {}",
        state.config.server.host,
        state.root.display()
    ));
    if let Some(workers) = state.config.server.workers {
        log_info(&format!("Worker threads: {workers}"));
    }
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    log_warning(&format!("Failed to serve connection: {err}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    if enabled(LogLevel::Warn) {
        write_error(&format!("[WARN] {message}"));
    }
}

pub fn log_info(message: &str) {
    if enabled(LogLevel::Info) {
        write_error(&format!("[INFO] {message}"));
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: AccessLogFormat) {
    write_access(&entry.format(format));
}
