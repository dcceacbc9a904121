// Server loop module
// Owns the listener and accepts connections until shutdown is requested

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::spawn_connection;
use super::listener::create_listener;
use crate::config::{AccessLogFormat, Config};
use crate::error::ServerError;
use crate::handler::StaticHandler;
use crate::logger;

/// The listening server, owned by the entry point
pub struct Server {
    listener: TcpListener,
    handler: Arc<StaticHandler>,
    access_log: Option<AccessLogFormat>,
}

impl Server {
    /// Resolve the document root and bind the listener described by `config`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: &Config) -> Result<Self, ServerError> {
        let addr = config.socket_addr()?;
        let root = config.resolve_root()?;
        let listener =
            create_listener(addr).map_err(|source| ServerError::Bind { addr, source })?;

        let access_log = config
            .logging
            .access_log
            .then_some(config.logging.access_log_format);

        Ok(Self::from_listener(
            listener,
            StaticHandler::new(root, &config.http),
            access_log,
        ))
    }

    pub fn from_listener(
        listener: TcpListener,
        handler: StaticHandler,
        access_log: Option<AccessLogFormat>,
    ) -> Self {
        Self {
            listener,
            handler: Arc::new(handler),
            access_log,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handler(&self) -> &StaticHandler {
        &self.handler
    }

    /// Accept connections until `shutdown` resolves, then drop the listener
    ///
    /// Accept errors are logged and do not stop the loop. Connections still
    /// in flight at shutdown are left to their tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            spawn_connection(
                                stream,
                                peer_addr,
                                Arc::clone(&self.handler),
                                self.access_log,
                            );
                        }
                        Err(e) => {
                            logger::log_error(&format!("Failed to accept connection: {e}"));
                        }
                    }
                }

                () = &mut shutdown => {
                    break;
                }
            }
        }

        drop(self.listener);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use std::fs;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    const INDEX_HTML: &str = "<!DOCTYPE html><title>v86</title>\n";

    struct RunningServer {
        addr: SocketAddr,
        stop: oneshot::Sender<()>,
        task: JoinHandle<Result<(), ServerError>>,
        _root: TempDir,
    }

    async fn start() -> RunningServer {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("index.html"), INDEX_HTML).unwrap();

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let http_config = HttpConfig {
            server_name: "coi-serve/test".to_string(),
            index_files: vec!["index.html".to_string()],
        };
        let handler = StaticHandler::new(root.path().canonicalize().unwrap(), &http_config);
        let server = Server::from_listener(listener, handler, Some(AccessLogFormat::Common));
        let addr = server.local_addr().unwrap();

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async {
            let _ = stopped.await;
        }));

        RunningServer {
            addr,
            stop,
            task,
            _root: root,
        }
    }

    /// Send one request with `Connection: close` and return the raw response
    async fn exchange(addr: SocketAddr, method: &str, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        String::from_utf8(raw).unwrap()
    }

    fn split_response(raw: &str) -> (String, String) {
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        (head.to_ascii_lowercase(), body.to_string())
    }

    fn assert_isolation_headers(head: &str) {
        for line in [
            "cross-origin-opener-policy: same-origin",
            "cross-origin-embedder-policy: require-corp",
            "access-control-allow-origin: *",
        ] {
            assert_eq!(head.matches(line).count(), 1, "{line} in\n{head}");
        }
    }

    #[tokio::test]
    async fn test_get_index_over_tcp() {
        let server = start().await;
        let (head, body) = split_response(&exchange(server.addr, "GET", "/index.html").await);

        assert!(head.starts_with("http/1.1 200 ok"), "{head}");
        assert!(head.contains("content-type: text/html"));
        assert_isolation_headers(&head);
        assert_eq!(body, INDEX_HTML);
    }

    #[tokio::test]
    async fn test_missing_file_over_tcp() {
        let server = start().await;
        let (head, _) = split_response(&exchange(server.addr, "GET", "/nonexistent-file.xyz").await);

        assert!(head.starts_with("http/1.1 404"), "{head}");
        assert_isolation_headers(&head);
    }

    #[tokio::test]
    async fn test_options_over_tcp() {
        let server = start().await;
        let (head, body) = split_response(&exchange(server.addr, "OPTIONS", "/does-not-exist").await);

        assert!(head.starts_with("http/1.1 200"), "{head}");
        assert_isolation_headers(&head);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_method_over_tcp() {
        let server = start().await;
        let (head, _) = split_response(&exchange(server.addr, "DELETE", "/index.html").await);

        assert!(head.starts_with("http/1.1 501"), "{head}");
        assert!(head.contains("allow: get, head, options"));
        assert_isolation_headers(&head);
    }

    #[tokio::test]
    async fn test_shutdown_stops_accept_loop() {
        let server = start().await;
        let _ = exchange(server.addr, "GET", "/").await;

        server.stop.send(()).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), server.task)
            .await
            .expect("server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_bind_fails_when_port_taken() {
        let server = start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::load_from(&dir.path().join("missing.toml")).unwrap();
        config.server.host = server.addr.ip().to_string();
        config.server.port = server.addr.port();
        config.server.root = dir.path().to_path_buf();

        let err = Server::bind(&config).err().expect("second bind must fail");
        assert!(err.is_addr_in_use(), "{err}");
    }
}
