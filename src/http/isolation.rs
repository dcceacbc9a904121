//! Cross-origin isolation headers
//!
//! Browsers only expose `SharedArrayBuffer` to pages that are cross-origin
//! isolated. Every response leaving the server goes through
//! [`apply_isolation_headers`].

use hyper::header::{HeaderMap, HeaderName, HeaderValue};

/// The injected headers and their values, in emission order
pub const ISOLATION_HEADERS: [(&str, &str); 3] = [
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-embedder-policy", "require-corp"),
    ("access-control-allow-origin", "*"),
];

/// Set the three isolation headers, replacing any existing values
///
/// Uses `insert`, so calling this more than once never yields duplicate
/// header lines.
pub fn apply_isolation_headers(headers: &mut HeaderMap) {
    for (name, value) in ISOLATION_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
}
