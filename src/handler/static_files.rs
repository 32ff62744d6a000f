//! Static file serving module
//!
//! Maps request paths onto the served root and builds the file, listing,
//! redirect and error responses for them.

use crate::config::AppState;
use crate::handler::listing;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use percent_encoding::percent_decode_str;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

const NOT_FOUND_MESSAGE: &str = "File not found";
const LIST_DENIED_MESSAGE: &str = "No permission to list directory";

/// Drop any query or fragment, then percent-decode, replacing invalid UTF-8
pub fn decode_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

/// Map a decoded URL path to a filesystem path under `root`.
///
/// Normalisation is purely lexical: empty and `.` segments are dropped, `..`
/// removes the previous segment and stops at the root, and segments that
/// could be read as a path of their own (backslash, NUL) are skipped.
pub fn resolve_path(root: &Path, decoded_path: &str) -> PathBuf {
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s if s.contains(['\\', '\0']) => {}
            s => segments.push(s),
        }
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(segments);
    resolved
}

/// Serve whatever the request path resolves to under the served root
pub async fn serve(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    let decoded = decode_path(ctx.path);
    let fs_path = resolve_path(&state.root, &decoded);

    let metadata = match fs::metadata(&fs_path).await {
        Ok(m) => m,
        Err(e) => return file_error_response(&e, &fs_path, ctx.is_head),
    };

    if metadata.is_dir() {
        return serve_directory(ctx, state, &fs_path, &decoded).await;
    }

    // A trailing slash names a directory, never a file
    if ctx.path.ends_with('/') {
        return http::build_error_response(
            StatusCode::NOT_FOUND,
            Some(NOT_FOUND_MESSAGE),
            ctx.is_head,
        );
    }

    serve_file(ctx, &fs_path, &metadata).await
}

/// Serve a directory: redirect to the slash form, then index file, then listing
async fn serve_directory(
    ctx: &RequestContext<'_>,
    state: &AppState,
    dir: &Path,
    display_path: &str,
) -> Response<Full<Bytes>> {
    if !ctx.path.ends_with('/') {
        let location = match ctx.query {
            Some(q) => format!("{}/?{q}", ctx.path),
            None => format!("{}/", ctx.path),
        };
        return http::build_redirect_response(&location);
    }

    for index_file in &state.config.http.index_files {
        let index_path = dir.join(index_file);
        if let Ok(m) = fs::metadata(&index_path).await {
            if m.is_file() {
                return serve_file(ctx, &index_path, &m).await;
            }
        }
    }

    match listing::read_entries(dir).await {
        Ok(entries) => {
            http::build_html_response(listing::render(display_path, &entries), ctx.is_head)
        }
        Err(e) => {
            logger::log_warning(&format!(
                "Failed to list directory '{}': {e}",
                dir.display()
            ));
            let status = if e.kind() == io::ErrorKind::PermissionDenied {
                StatusCode::FORBIDDEN
            } else {
                StatusCode::NOT_FOUND
            };
            http::build_error_response(status, Some(LIST_DENIED_MESSAGE), ctx.is_head)
        }
    }
}

/// Serve a regular file, honouring `If-Modified-Since`
async fn serve_file(
    ctx: &RequestContext<'_>,
    path: &Path,
    metadata: &Metadata,
) -> Response<Full<Bytes>> {
    let last_modified = metadata.modified().ok();

    // If-None-Match takes precedence, and without ETags it never matches
    if ctx.if_none_match.is_none() {
        if let Some(mtime) = last_modified {
            if cache::is_not_modified(mtime, ctx.if_modified_since.as_deref()) {
                return http::build_not_modified_response();
            }
        }
    }

    let content = match fs::read(path).await {
        Ok(c) => c,
        Err(e) => return file_error_response(&e, path, ctx.is_head),
    };

    let last_modified = last_modified.map(cache::format_http_date).unwrap_or_default();

    http::build_file_response(
        Bytes::from(content),
        mime::get_content_type(path),
        &last_modified,
        ctx.is_head,
    )
}

fn file_error_response(err: &io::Error, path: &Path, is_head: bool) -> Response<Full<Bytes>> {
    match err.kind() {
        io::ErrorKind::PermissionDenied => {
            logger::log_warning(&format!("Permission denied: {}", path.display()));
            http::build_error_response(StatusCode::FORBIDDEN, None, is_head)
        }
        io::ErrorKind::NotFound => {
            http::build_error_response(StatusCode::NOT_FOUND, Some(NOT_FOUND_MESSAGE), is_head)
        }
        _ => {
            logger::log_warning(&format!("Failed to open '{}': {err}", path.display()));
            http::build_error_response(StatusCode::NOT_FOUND, Some(NOT_FOUND_MESSAGE), is_head)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_plain_path() {
        let root = Path::new("/srv/www");
        assert_eq!(resolve_path(root, "/foo.txt"), PathBuf::from("/srv/www/foo.txt"));
        assert_eq!(resolve_path(root, "/a/b/"), PathBuf::from("/srv/www/a/b"));
        assert_eq!(resolve_path(root, "/"), PathBuf::from("/srv/www"));
    }

    #[test]
    fn test_resolve_never_escapes_root() {
        let root = Path::new("/srv/www");
        assert_eq!(
            resolve_path(root, "/../../etc/passwd"),
            PathBuf::from("/srv/www/etc/passwd")
        );
        assert_eq!(resolve_path(root, "/a/../../b"), PathBuf::from("/srv/www/b"));
        assert_eq!(resolve_path(root, "/a/./b//c"), PathBuf::from("/srv/www/a/b/c"));
    }

    #[test]
    fn test_resolve_drops_suspicious_segments() {
        let root = Path::new("/srv/www");
        assert_eq!(
            resolve_path(root, "/..\\..\\secret/x"),
            PathBuf::from("/srv/www/x")
        );
    }

    #[test]
    fn test_decode_strips_query_and_fragment() {
        assert_eq!(decode_path("/a.html?v=2"), "/a.html");
        assert_eq!(decode_path("/a.html#top"), "/a.html");
        // An encoded question mark is part of the name
        assert_eq!(decode_path("/what%3F.txt"), "/what?.txt");
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/my%20file.txt"), "/my file.txt");
        assert_eq!(decode_path("/%2e%2e/x"), "/../x");
        assert_eq!(decode_path("/caf%C3%A9"), "/café");
    }

    #[test]
    fn test_encoded_traversal_stays_inside() {
        let root = Path::new("/srv/www");
        let decoded = decode_path("/%2e%2e/%2e%2e/etc/passwd");
        assert_eq!(resolve_path(root, &decoded), PathBuf::from("/srv/www/etc/passwd"));
    }
}
