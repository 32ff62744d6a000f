//! Directory listing module
//!
//! Renders the HTML index shown for directories without an index file.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::io;
use std::path::Path;
use tokio::fs;

/// Characters left unescaped in listing links, everything else is percent-encoded
const HREF_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// One immediate child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    /// True for directories and for symlinks pointing at one
    pub is_dir: bool,
    pub is_symlink: bool,
}

impl ListingEntry {
    fn link_name(&self) -> String {
        if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }

    fn display_name(&self) -> String {
        if self.is_symlink {
            format!("{}@", self.name)
        } else {
            self.link_name()
        }
    }
}

/// Read the immediate children of `dir`, sorted case-insensitively
pub async fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let is_symlink = entry
            .file_type()
            .await
            .map(|t| t.is_symlink())
            .unwrap_or(false);
        // metadata() follows symlinks, so a link to a directory lists as one
        let is_dir = fs::metadata(entry.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);

        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
            is_symlink,
        });
    }

    entries.sort_by_cached_key(|e| e.name.to_lowercase());
    Ok(entries)
}

/// Render the listing page; `display_path` is the decoded request path
pub fn render(display_path: &str, entries: &[ListingEntry]) -> String {
    let title = format!("Directory listing for {}", escape_html(display_path));

    let mut html = String::with_capacity(256 + entries.len() * 64);
    html.push_str("<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n</head>\n<body>\n"));
    html.push_str(&format!("<h1>{title}</h1>\n<hr>\n<ul>\n"));

    for entry in entries {
        let href = utf8_percent_encode(&entry.link_name(), HREF_ENCODE_SET).to_string();
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            escape_html(&href),
            escape_html(&entry.display_name()),
        ));
    }

    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

/// Escape text for use in HTML content and attribute values
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, is_dir: bool, is_symlink: bool) -> ListingEntry {
        ListingEntry {
            name: name.to_string(),
            is_dir,
            is_symlink,
        }
    }

    #[test]
    fn test_render_files_and_dirs() {
        let html = render(
            "/sub/",
            &[entry("a.txt", false, false), entry("nested", true, false)],
        );
        assert!(html.contains("<title>Directory listing for /sub/</title>"));
        assert!(html.contains("<h1>Directory listing for /sub/</h1>"));
        assert!(html.contains(r#"<li><a href="a.txt">a.txt</a></li>"#));
        assert!(html.contains(r#"<li><a href="nested/">nested/</a></li>"#));
    }

    #[test]
    fn test_render_symlink_marker() {
        let html = render("/", &[entry("link", true, true)]);
        assert!(html.contains(r#"<a href="link/">link@</a>"#));
    }

    #[test]
    fn test_render_encodes_and_escapes() {
        let html = render("/<x>/", &[entry("my file&<b>.txt", false, false)]);
        assert!(html.contains("Directory listing for /&lt;x&gt;/"));
        assert!(html.contains(r#"href="my%20file%26%3Cb%3E.txt""#));
        assert!(html.contains(">my file&amp;&lt;b&gt;.txt</a>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"a&b<c>"d'"#), "a&amp;b&lt;c&gt;&quot;d&#x27;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[tokio::test]
    async fn test_read_entries_sorted_case_insensitive() {
        let dir = std::env::temp_dir().join(format!("nocache-listing-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("Beta")).unwrap();
        std::fs::write(dir.join("alpha.txt"), b"a").unwrap();
        std::fs::write(dir.join("Gamma.txt"), b"g").unwrap();

        let entries = read_entries(&dir).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["alpha.txt", "Beta", "Gamma.txt"]);
        assert!(entries[1].is_dir);
        assert!(!entries[0].is_dir);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
