//! Connectivity check against both collector endpoints.
//!
//! Posts one probe entry to the ingestion endpoint, then opens and closes
//! a WebSocket to the socket endpoint.

use std::io::Write;

use teratrace_client::{
    ClientConfig, ClientError, Connection, Connector, HttpSender, Level, LogRecord, Normalizer,
    WsConnector,
};
use tokio::time::timeout;

use crate::error::CliError;

/// Check command executor.
pub struct CheckCommand {
    config: ClientConfig,
}

impl CheckCommand {
    /// Create a new check command.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Execute the check, writing one line per endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if either endpoint is unreachable or output fails.
    pub async fn execute<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let mut failed = Vec::new();

        let http_url = self.config.ingest_url()?;
        match self.check_http().await {
            Ok(()) => writeln!(writer, "http  {http_url}  ok")?,
            Err(e) => {
                writeln!(writer, "http  {http_url}  failed: {e}")?;
                failed.push("http");
            }
        }

        let ws_url = self.config.socket_url()?;
        match self.check_socket(ws_url.as_str()).await {
            Ok(()) => writeln!(writer, "ws    {ws_url}  ok")?,
            Err(e) => {
                writeln!(writer, "ws    {ws_url}  failed: {e}")?;
                failed.push("ws");
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(CliError::Check(format!("{} unreachable", failed.join(", "))))
        }
    }

    async fn check_http(&self) -> Result<(), ClientError> {
        let entry = Normalizer::new(self.config.service.clone()).normalize(
            LogRecord::new()
                .level(Level::Debug)
                .message("teratrace connectivity check")
                .meta("probe", true),
        );
        HttpSender::from_config(&self.config)?.send(&entry).await
    }

    async fn check_socket(&self, url: &str) -> Result<(), ClientError> {
        let mut connection = timeout(self.config.request_timeout(), WsConnector.connect(url))
            .await
            .map_err(|_| ClientError::SocketConnect("timed out".into()))??;
        connection.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn unused_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    /// Accepts WebSocket handshakes until the test ends.
    async fn socket_collector() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                        use futures::StreamExt;
                        while ws.next().await.is_some() {}
                    }
                });
            }
        });
        port
    }

    #[tokio::test]
    async fn both_endpoints_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ingest"))
            .and(body_partial_json(serde_json::json!({ "probe": true, "level": "DEBUG" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        let ws_port = socket_collector().await;

        let config = ClientConfig::default()
            .with_host("127.0.0.1")
            .with_http_port(server.address().port())
            .with_ws_port(ws_port);
        let mut out = Vec::new();
        CheckCommand::new(config).execute(&mut out).await.unwrap();

        let report = String::from_utf8(out).unwrap();
        assert_eq!(report.lines().filter(|l| l.ends_with("  ok")).count(), 2);
    }

    #[tokio::test]
    async fn unreachable_socket_fails_the_check() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let config = ClientConfig::default()
            .with_host("127.0.0.1")
            .with_http_port(server.address().port())
            .with_ws_port(unused_port())
            .with_request_timeout(Duration::from_secs(2));
        let mut out = Vec::new();
        let result = CheckCommand::new(config).execute(&mut out).await;

        assert!(matches!(result, Err(CliError::Check(msg)) if msg == "ws unreachable"));
        let report = String::from_utf8(out).unwrap();
        assert!(report.contains("http  http://127.0.0.1:"));
        assert!(report.contains("ws    ws://127.0.0.1:"));
        assert!(report.lines().any(|l| l.starts_with("ws") && l.contains("failed")));
    }
}
