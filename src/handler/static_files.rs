//! Static file serving module
//!
//! Maps request paths onto the document root and builds file, redirect,
//! listing and error responses.

use crate::handler::{listing, RequestContext};
use crate::http::{self, cache, mime, response};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use percent_encoding::percent_decode_str;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Serve a `GET`/`HEAD` request from `root`
pub async fn serve(
    ctx: &RequestContext<'_>,
    root: &Path,
    index_files: &[String],
) -> Response<Full<Bytes>> {
    let Some(fs_path) = resolve_request_path(root, ctx.path) else {
        return http::build_404_response();
    };

    let metadata = match fs::metadata(&fs_path).await {
        Ok(m) => m,
        Err(e) => return io_error_response(&fs_path, &e),
    };

    if let Err(resp) = ensure_within_root(root, &fs_path, ctx.path).await {
        return resp;
    }

    if metadata.is_dir() {
        return serve_directory(ctx, root, &fs_path, index_files).await;
    }

    // "/file.txt/" names a directory that does not exist
    if ctx.path.ends_with('/') {
        return http::build_404_response();
    }

    serve_file(ctx, &fs_path, &metadata).await
}

/// Map a raw request path to a location under `root`
///
/// The path is percent-decoded and split on `/`; empty, `.` and `..`
/// segments are dropped, so the result can never climb above `root`
/// lexically. Returns `None` when the decoded path is not valid UTF-8 or a
/// segment contains a backslash or NUL.
pub fn resolve_request_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;

    let mut resolved = root.to_path_buf();
    for segment in decoded.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        if segment.contains(['\\', '\0']) {
            return None;
        }
        resolved.push(segment);
    }
    Some(resolved)
}

/// Reject paths whose canonical form (after following symlinks) leaves `root`
async fn ensure_within_root(
    root: &Path,
    fs_path: &Path,
    request_path: &str,
) -> Result<(), Response<Full<Bytes>>> {
    let canonical = fs::canonicalize(fs_path)
        .await
        .map_err(|e| io_error_response(fs_path, &e))?;

    if canonical.starts_with(root) {
        Ok(())
    } else {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            request_path,
            canonical.display()
        ));
        Err(http::build_403_response())
    }
}

async fn serve_directory(
    ctx: &RequestContext<'_>,
    root: &Path,
    dir: &Path,
    index_files: &[String],
) -> Response<Full<Bytes>> {
    if !ctx.path.ends_with('/') {
        let location = match ctx.query {
            Some(q) => format!("{}/?{q}", ctx.path),
            None => format!("{}/", ctx.path),
        };
        return http::build_redirect_response(&location);
    }

    for index_file in index_files {
        let candidate = dir.join(index_file);
        if let Ok(metadata) = fs::metadata(&candidate).await {
            if metadata.is_file() {
                if let Err(resp) = ensure_within_root(root, &candidate, ctx.path).await {
                    return resp;
                }
                return serve_file(ctx, &candidate, &metadata).await;
            }
        }
    }

    match listing::render_listing(dir, ctx.path).await {
        Ok(html) => response::build_html_response(html),
        Err(e) => io_error_response(dir, &e),
    }
}

async fn serve_file(
    ctx: &RequestContext<'_>,
    file_path: &Path,
    metadata: &Metadata,
) -> Response<Full<Bytes>> {
    let mtime = metadata.modified().ok();
    let last_modified = mtime.map(cache::last_modified_value);

    if let (Some(mtime), Some(value)) = (mtime, last_modified.as_deref()) {
        if cache::is_not_modified(ctx.if_modified_since, ctx.has_if_none_match, mtime) {
            return http::build_304_response(value);
        }
    }

    // Open even for HEAD so unreadable files report 403 consistently
    let mut file = match fs::File::open(file_path).await {
        Ok(f) => f,
        Err(e) => return io_error_response(file_path, &e),
    };

    let content_type = mime::content_type_for(file_path);

    if ctx.is_head {
        return response::build_file_response(
            Bytes::new(),
            metadata.len(),
            content_type,
            last_modified.as_deref(),
        );
    }

    let mut content = Vec::new();
    if let Err(e) = file.read_to_end(&mut content).await {
        return io_error_response(file_path, &e);
    }
    let content_length = content.len() as u64;

    response::build_file_response(
        Bytes::from(content),
        content_length,
        content_type,
        last_modified.as_deref(),
    )
}

/// Convert a filesystem error into the conventional status
fn io_error_response(path: &Path, err: &io::Error) -> Response<Full<Bytes>> {
    match err.kind() {
        // File not found is common (404), no need to log
        io::ErrorKind::NotFound => http::build_404_response(),
        io::ErrorKind::PermissionDenied => {
            logger::log_warning(&format!("Permission denied: {}", path.display()));
            http::build_403_response()
        }
        _ => {
            logger::log_error(&format!("Failed to access '{}': {err}", path.display()));
            http::build_404_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED};
    use hyper::StatusCode;
    use std::fs as std_fs;

    fn ctx(path: &str) -> RequestContext<'_> {
        RequestContext {
            path,
            query: None,
            is_head: false,
            if_modified_since: None,
            has_if_none_match: false,
        }
    }

    fn index_files() -> Vec<String> {
        vec!["index.html".to_string(), "index.htm".to_string()]
    }

    fn temp_root() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        (dir, root)
    }

    #[test]
    fn test_resolve_plain_path() {
        let root = Path::new("/srv");
        assert_eq!(
            resolve_request_path(root, "/js/app.js"),
            Some(PathBuf::from("/srv/js/app.js"))
        );
        assert_eq!(resolve_request_path(root, "/"), Some(PathBuf::from("/srv")));
    }

    #[test]
    fn test_resolve_drops_dot_segments() {
        let root = Path::new("/srv");
        assert_eq!(
            resolve_request_path(root, "/../../etc/passwd"),
            Some(PathBuf::from("/srv/etc/passwd"))
        );
        assert_eq!(
            resolve_request_path(root, "/a/./b//c"),
            Some(PathBuf::from("/srv/a/b/c"))
        );
        // encoded traversal is decoded first, then dropped
        assert_eq!(
            resolve_request_path(root, "/%2e%2e/%2E%2E/etc/passwd"),
            Some(PathBuf::from("/srv/etc/passwd"))
        );
    }

    #[test]
    fn test_resolve_decodes_percent_escapes() {
        let root = Path::new("/srv");
        assert_eq!(
            resolve_request_path(root, "/my%20disk.img"),
            Some(PathBuf::from("/srv/my disk.img"))
        );
        assert_eq!(resolve_request_path(root, "/%ff%fe"), None);
    }

    #[test]
    fn test_resolve_rejects_nul_and_backslash() {
        let root = Path::new("/srv");
        assert_eq!(resolve_request_path(root, "/%00"), None);
        assert_eq!(resolve_request_path(root, "/js/app%00.js"), None);
        assert_eq!(resolve_request_path(root, "/..%5C..%5Cetc"), None);
    }

    #[tokio::test]
    async fn test_nul_segment_is_404_not_redirect() {
        let (_dir, root) = temp_root();
        let response = serve(&ctx("/%00"), &root, &index_files()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_file_bytes() {
        let (_dir, root) = temp_root();
        std_fs::write(root.join("seabios.bin"), [1u8, 2, 3]).unwrap();

        let response = serve(&ctx("/seabios.bin"), &root, &index_files()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_LENGTH], "3");
        assert!(response.headers().contains_key(LAST_MODIFIED));
    }

    #[tokio::test]
    async fn test_trailing_slash_on_file_is_404() {
        let (_dir, root) = temp_root();
        std_fs::write(root.join("a.txt"), b"a").unwrap();

        let response = serve(&ctx("/a.txt/"), &root, &index_files()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_if_modified_since_yields_304() {
        let (_dir, root) = temp_root();
        let path = root.join("app.js");
        std_fs::write(&path, b"console.log(1)").unwrap();
        let mtime = std_fs::metadata(&path).unwrap().modified().unwrap();
        let since = cache::last_modified_value(mtime);

        let mut request = ctx("/app.js");
        request.if_modified_since = Some(since.as_str());
        let response = serve(&request, &root, &index_files()).await;
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

        request.has_if_none_match = true;
        let response = serve(&request, &root, &index_files()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_directory_without_index_lists_entries() {
        let (_dir, root) = temp_root();
        std_fs::create_dir(root.join("disks")).unwrap();
        std_fs::write(root.join("disks").join("linux4.iso"), b"iso").unwrap();

        let response = serve(&ctx("/disks/"), &root, &index_files()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("Directory listing for /disks/"));
        assert!(html.contains("<a href=\"linux4.iso\">linux4.iso</a>"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escaping_root_is_forbidden() {
        let (_outside, outside) = temp_root();
        std_fs::write(outside.join("secret.txt"), b"secret").unwrap();
        let (_dir, root) = temp_root();
        std::os::unix::fs::symlink(outside.join("secret.txt"), root.join("link.txt")).unwrap();

        let response = serve(&ctx("/link.txt"), &root, &index_files()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_inside_root_is_served() {
        let (_dir, root) = temp_root();
        std_fs::write(root.join("real.txt"), b"real").unwrap();
        std::os::unix::fs::symlink(root.join("real.txt"), root.join("alias.txt")).unwrap();

        let response = serve(&ctx("/alias.txt"), &root, &index_files()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
