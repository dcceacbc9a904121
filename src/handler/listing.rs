//! Directory listing page for directories without an index file

use crate::logger;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt::Write;
use std::io;
use std::path::Path;
use tokio::fs;

/// Characters left unescaped in listing hrefs (RFC 3986 unreserved plus `/`)
const HREF_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

#[derive(Debug, PartialEq, Eq)]
struct ListingEntry {
    name: String,
    is_dir: bool,
    is_symlink: bool,
}

impl ListingEntry {
    /// Directories get a trailing `/`; symlinks are shown with `@`
    fn display_name(&self) -> String {
        if self.is_symlink {
            format!("{}@", self.name)
        } else if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }

    fn href(&self) -> String {
        let target = if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        };
        utf8_percent_encode(&target, HREF_ESCAPE).to_string()
    }
}

/// Render the HTML listing of `dir`
///
/// `request_path` is the raw request path and is shown decoded in the title.
pub async fn render_listing(dir: &Path, request_path: &str) -> io::Result<String> {
    let entries = read_entries(dir).await?;
    let display_path = percent_encoding::percent_decode_str(request_path).decode_utf8_lossy();
    Ok(render_html(&escape_html(&display_path), &entries))
}

async fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut read_dir = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = read_dir.next_entry().await? {
        // Paths that are not UTF-8 cannot be requested, so no link is offered
        let Ok(name) = entry.file_name().into_string() else {
            logger::log_warning(&format!(
                "Skipping non UTF-8 entry in listing: {}",
                entry.path().display()
            ));
            continue;
        };
        let file_type = match entry.file_type().await {
            Ok(t) => t,
            Err(e) => {
                logger::log_warning(&format!(
                    "Skipping unreadable entry {}: {e}",
                    entry.path().display()
                ));
                continue;
            }
        };
        // Follow symlinks to decide whether the target is a directory
        let is_dir = if file_type.is_symlink() {
            fs::metadata(entry.path()).await.is_ok_and(|m| m.is_dir())
        } else {
            file_type.is_dir()
        };
        entries.push(ListingEntry {
            name,
            is_dir,
            is_symlink: file_type.is_symlink(),
        });
    }

    entries.sort_by_cached_key(|e| e.name.to_lowercase());
    Ok(entries)
}

fn render_html(display_path: &str, entries: &[ListingEntry]) -> String {
    let title = format!("Directory listing for {display_path}");
    let mut html = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<hr>\n<ul>\n"
    );
    for entry in entries {
        let _ = writeln!(
            html,
            "<li><a href=\"{}\">{}</a></li>",
            entry.href(),
            escape_html(&entry.display_name())
        );
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
