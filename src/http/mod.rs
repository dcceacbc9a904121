//! HTTP protocol layer module
//!
//! Protocol-level helpers decoupled from file serving: response builders,
//! content types, cache validation and the cross-origin isolation headers.

pub mod cache;
pub mod isolation;
pub mod mime;
pub mod response;

// Re-export commonly used items
pub use isolation::apply_isolation_headers;
pub use response::{
    build_304_response, build_403_response, build_404_response, build_501_response,
    build_options_response, build_redirect_response,
};
