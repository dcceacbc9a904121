//! Request handler module
//!
//! [`StaticHandler`] answers every request: `OPTIONS` short-circuits, `GET`
//! and `HEAD` go to static file serving, anything else is 501. All responses
//! pass through [`StaticHandler::finalize`], which adds the isolation headers.

pub mod listing;
pub mod static_files;

use crate::config::HttpConfig;
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH, SERVER};
use hyper::{Method, Request, Response};
use std::path::{Path, PathBuf};

/// Request information needed by file serving
#[derive(Debug)]
pub struct RequestContext<'a> {
    /// Raw (still percent-encoded) request path
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_modified_since: Option<&'a str>,
    pub has_if_none_match: bool,
}

impl<'a> RequestContext<'a> {
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        let headers = req.headers();
        Self {
            path: req.uri().path(),
            query: req.uri().query(),
            is_head: req.method() == Method::HEAD,
            if_modified_since: headers
                .get(IF_MODIFIED_SINCE)
                .and_then(|v| v.to_str().ok()),
            has_if_none_match: headers.contains_key(IF_NONE_MATCH),
        }
    }
}

/// Serves files below a document root and decorates every response
#[derive(Debug, Clone)]
pub struct StaticHandler {
    root: PathBuf,
    index_files: Vec<String>,
    server_name: HeaderValue,
}

impl StaticHandler {
    /// `root` must already be canonical (see `Config::resolve_root`)
    pub fn new(root: PathBuf, http_config: &HttpConfig) -> Self {
        let server_name = HeaderValue::from_str(&http_config.server_name).unwrap_or_else(|_| {
            logger::log_warning(&format!(
                "Invalid server name '{}', using default",
                http_config.server_name
            ));
            HeaderValue::from_static("coi-serve")
        });

        Self {
            root,
            index_files: http_config.index_files.clone(),
            server_name,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Produce the response for `req`
    ///
    /// Never fails: filesystem problems become error statuses.
    pub async fn handle<B>(&self, req: &Request<B>) -> Response<Full<Bytes>> {
        let is_head = req.method() == Method::HEAD;

        let response = match *req.method() {
            Method::OPTIONS => http::build_options_response(),
            Method::GET | Method::HEAD => {
                let ctx = RequestContext::from_request(req);
                static_files::serve(&ctx, &self.root, &self.index_files).await
            }
            _ => {
                logger::log_warning(&format!("Unsupported method: {}", req.method()));
                http::build_501_response()
            }
        };

        self.finalize(response, is_head)
    }

    /// Shared last step for every response
    ///
    /// Sets `Server` and the isolation headers (overwriting, so applying it
    /// twice is harmless) and drops the body of HEAD responses while keeping
    /// their `Content-Length`.
    pub fn finalize(&self, mut response: Response<Full<Bytes>>, is_head: bool) -> Response<Full<Bytes>> {
        let headers = response.headers_mut();
        headers.insert(SERVER, self.server_name.clone());
        http::apply_isolation_headers(headers);

        if is_head {
            *response.body_mut() = Full::new(Bytes::new());
        }
        response
    }
}
