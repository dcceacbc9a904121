//! HTTP cache validation module
//!
//! `Last-Modified` generation and `If-Modified-Since` handling. No `ETag`s
//! and no `Cache-Control`: clients revalidate with the file's mtime only.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Format a file modification time as an HTTP-date
pub fn last_modified_value(mtime: SystemTime) -> String {
    httpdate::fmt_http_date(mtime)
}

/// Check whether a conditional GET can be answered with 304
///
/// `If-Modified-Since` is ignored when `If-None-Match` is present or when it
/// does not parse as an HTTP-date. HTTP-dates have one-second resolution, so
/// the mtime is truncated before comparing.
///
/// # Arguments
/// * `if_modified_since` - Client-sent If-Modified-Since header
/// * `has_if_none_match` - Whether the request also carried If-None-Match
/// * `mtime` - File modification time
pub fn is_not_modified(
    if_modified_since: Option<&str>,
    has_if_none_match: bool,
    mtime: SystemTime,
) -> bool {
    if has_if_none_match {
        return false;
    }
    let Some(since) = if_modified_since.and_then(|v| httpdate::parse_http_date(v).ok()) else {
        return false;
    };
    truncate_to_seconds(mtime) <= since
}

fn truncate_to_seconds(time: SystemTime) -> SystemTime {
    time.duration_since(UNIX_EPOCH)
        .map_or(time, |d| UNIX_EPOCH + Duration::from_secs(d.as_secs()))
}
