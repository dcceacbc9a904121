// Connection handling module
// Serves a single accepted TCP connection and writes access log lines

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, REFERER, USER_AGENT};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, Version};
use hyper_util::rt::TokioIo;

use crate::config::AccessLogFormat;
use crate::handler::StaticHandler;
use crate::logger::{self, AccessLogEntry};

/// Handle a single connection in a spawned task.
///
/// HTTP/1.1 with keep-alive and no read/write timeouts: an idle client keeps
/// its connection (and task) until it disconnects or the process exits.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `handler` - Shared request handler
/// * `access_log` - Access log format, `None` when access logging is off
pub fn spawn_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<StaticHandler>,
    access_log: Option<AccessLogFormat>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let service = service_fn(move |req: Request<hyper::body::Incoming>| {
            let handler = Arc::clone(&handler);
            async move {
                let started = Instant::now();
                // The body is never read; keep only the head
                let (parts, _body) = req.into_parts();
                let req = Request::from_parts(parts, ());
                let response = handler.handle(&req).await;
                if let Some(format) = access_log {
                    let entry = access_entry(peer_addr, &req, &response, started);
                    logger::log_access(&entry, format);
                }
                Ok::<_, Infallible>(response)
            }
        });

        let mut builder = http1::Builder::new();
        builder.keep_alive(true);

        // Aborted writes (client went away mid-response) end up here and are dropped
        if let Err(err) = builder.serve_connection(io, service).await {
            logger::log_connection_error(&peer_addr, &err);
        }
    });
}

fn access_entry<B>(
    peer_addr: SocketAddr,
    req: &Request<B>,
    response: &Response<Full<Bytes>>,
    started: Instant,
) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::{Method, StatusCode};

    #[test]
    fn test_access_entry_fields() {
        let req = Request::builder()
            .method(Method::GET)
            .uri("/index.html?v=1")
            .version(Version::HTTP_10)
            .header(USER_AGENT, "curl/8.0")
            .body(())
            .unwrap();
        let response = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from_static(b"missing")))
            .unwrap();

        let entry = access_entry(
            "10.0.0.7:51000".parse().unwrap(),
            &req,
            &response,
            Instant::now(),
        );

        assert_eq!(entry.remote_addr, "10.0.0.7");
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.path, "/index.html");
        assert_eq!(entry.query.as_deref(), Some("v=1"));
        assert_eq!(entry.http_version, "1.0");
        assert_eq!(entry.status, 404);
        assert_eq!(entry.body_bytes, 7);
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(entry.referer, None);
    }
}
