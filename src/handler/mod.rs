//! Request handler module
//!
//! Static file serving rooted at the configured directory: files, index
//! files, directory listings and the error responses around them.

pub mod listing;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
