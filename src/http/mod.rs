//! HTTP protocol layer module
//!
//! Protocol helpers shared by the static file handler: content types,
//! HTTP dates and response builders.

pub mod cache;
pub mod mime;
pub mod response;

pub use response::{
    build_error_response, build_file_response, build_html_response, build_not_modified_response,
    build_redirect_response,
};
