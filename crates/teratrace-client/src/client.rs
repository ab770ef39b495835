//! Public client facade.
//!
//! [`TraceClient`] normalizes records and routes them to the transport
//! selected in its [`ClientConfig`].
//!
//! # Example
//!
//! ```rust,no_run
//! use teratrace_client::{ClientConfig, LogRecord, TraceClient, Transport};
//!
//! # async fn example() -> teratrace_client::Result<()> {
//! let client = TraceClient::new(
//!     ClientConfig::default()
//!         .with_service("checkout")
//!         .with_transport(Transport::Ws),
//! )?;
//!
//! client.info("Application started").await?;
//! client
//!     .log(
//!         LogRecord::new()
//!             .level("WARN")
//!             .message("Payment retry")
//!             .trace_id("trace-12345")
//!             .meta("attempt", 2),
//!     )
//!     .await?;
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```

use futures::future::BoxFuture;
use tokio::sync::broadcast;

use crate::config::{ClientConfig, Transport};
use crate::entry::{Level, LogRecord, Normalizer};
use crate::error::Result;
use crate::http::HttpSender;
use crate::socket::{ConnectionState, Connector, SocketEvent, SocketSender, SocketSettings, WsConnector};

/// Outcome of one delivery.
///
/// The entry is handed to its transport when the [`Delivery`] is created;
/// awaiting it only observes the result. On the WebSocket transport the
/// order of creation is the delivery order. HTTP requests are independent
/// and may complete in any order.
pub type Delivery = BoxFuture<'static, Result<()>>;

/// The sender chosen for a client.
#[derive(Debug, Clone)]
enum Dispatch {
    Http(HttpSender),
    Socket(SocketSender),
}

/// Log forwarding client.
#[derive(Debug, Clone)]
pub struct TraceClient {
    config: ClientConfig,
    normalizer: Normalizer,
    dispatch: Dispatch,
}

impl TraceClient {
    /// Creates a client.
    ///
    /// With the WebSocket transport the connection attempt starts here, so
    /// this must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_connector(config, WsConnector)
    }

    /// Creates a client whose WebSocket transport uses `connector`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_connector<C: Connector>(config: ClientConfig, connector: C) -> Result<Self> {
        config.validate()?;

        let dispatch = match config.transport {
            Transport::Http => Dispatch::Http(HttpSender::from_config(&config)?),
            Transport::Ws => Dispatch::Socket(SocketSender::spawn(
                SocketSettings::from_config(&config)?,
                connector,
            )),
        };

        Ok(Self {
            normalizer: Normalizer::new(config.service.clone()),
            config,
            dispatch,
        })
    }

    /// Normalizes and sends a record.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn log(&self, record: LogRecord) -> Delivery {
        let entry = self.normalizer.normalize(record);
        match &self.dispatch {
            Dispatch::Http(sender) => sender.send(&entry),
            Dispatch::Socket(sender) => sender.send(entry),
        }
    }

    /// Sends an `INFO` entry.
    pub fn info(&self, message: impl Into<String>) -> Delivery {
        self.info_with(message, LogRecord::new())
    }

    /// Sends a `WARN` entry.
    pub fn warn(&self, message: impl Into<String>) -> Delivery {
        self.warn_with(message, LogRecord::new())
    }

    /// Sends an `ERROR` entry.
    pub fn error(&self, message: impl Into<String>) -> Delivery {
        self.error_with(message, LogRecord::new())
    }

    /// Sends a `DEBUG` entry.
    pub fn debug(&self, message: impl Into<String>) -> Delivery {
        self.debug_with(message, LogRecord::new())
    }

    /// Sends an `INFO` entry with extra fields from `options`.
    pub fn info_with(&self, message: impl Into<String>, options: LogRecord) -> Delivery {
        self.log_at(Level::Info, message.into(), options)
    }

    /// Sends a `WARN` entry with extra fields from `options`.
    pub fn warn_with(&self, message: impl Into<String>, options: LogRecord) -> Delivery {
        self.log_at(Level::Warn, message.into(), options)
    }

    /// Sends an `ERROR` entry with extra fields from `options`.
    pub fn error_with(&self, message: impl Into<String>, options: LogRecord) -> Delivery {
        self.log_at(Level::Error, message.into(), options)
    }

    /// Sends a `DEBUG` entry with extra fields from `options`.
    pub fn debug_with(&self, message: impl Into<String>, options: LogRecord) -> Delivery {
        self.log_at(Level::Debug, message.into(), options)
    }

    // Fields set in `options` take precedence over the level and message.
    fn log_at(&self, level: Level, message: String, mut options: LogRecord) -> Delivery {
        options.level.get_or_insert(level);
        options.message.get_or_insert(message);
        self.log(options)
    }

    /// Closes the persistent connection and disables reconnection.
    ///
    /// No-op for the HTTP transport.
    pub async fn close(&self) {
        if let Dispatch::Socket(sender) = &self.dispatch {
            sender.close().await;
        }
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The transport in use.
    #[must_use]
    pub fn transport(&self) -> Transport {
        self.config.transport
    }

    /// Connection state of the WebSocket transport, `None` for HTTP.
    #[must_use]
    pub fn connection_state(&self) -> Option<ConnectionState> {
        match &self.dispatch {
            Dispatch::Socket(sender) => Some(sender.state()),
            Dispatch::Http(_) => None,
        }
    }

    /// Lifecycle events of the WebSocket transport, `None` for HTTP.
    #[must_use]
    pub fn events(&self) -> Option<broadcast::Receiver<SocketEvent>> {
        match &self.dispatch {
            Dispatch::Socket(sender) => Some(sender.subscribe()),
            Dispatch::Http(_) => None,
        }
    }

    /// Entries waiting for the WebSocket connection (0 for HTTP).
    pub async fn queued(&self) -> usize {
        match &self.dispatch {
            Dispatch::Socket(sender) => sender.queued().await,
            Dispatch::Http(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::socket::Connection;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use tokio::sync::{mpsc, Notify};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    /// Connector that opens once `open` is notified and records every frame.
    #[derive(Clone, Default)]
    struct GatedConnector {
        gate: Arc<Notify>,
        frames: Arc<Mutex<Vec<Value>>>,
    }

    struct RecordingConnection {
        frames: Arc<Mutex<Vec<Value>>>,
        // Never receives; keeps the connection open
        _hold: mpsc::UnboundedSender<()>,
        idle: mpsc::UnboundedReceiver<()>,
    }

    impl Connector for GatedConnector {
        type Connection = RecordingConnection;

        async fn connect(&self, _url: &str) -> Result<RecordingConnection> {
            self.gate.notified().await;
            let (hold, idle) = mpsc::unbounded_channel();
            Ok(RecordingConnection {
                frames: Arc::clone(&self.frames),
                _hold: hold,
                idle,
            })
        }
    }

    impl Connection for RecordingConnection {
        async fn send_text(&mut self, text: String) -> Result<()> {
            self.frames
                .lock()
                .unwrap()
                .push(serde_json::from_str(&text).unwrap());
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            self.idle.recv().await;
            None
        }

        async fn close(&mut self) {}
    }

    fn http_config(server: &MockServer) -> ClientConfig {
        let port = server.address().port();
        ClientConfig::default()
            .with_host("127.0.0.1")
            .with_http_port(port)
            .with_service("test-service")
    }

    async fn ingest_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ingest"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        server
    }

    fn bodies(requests: &[Request]) -> Vec<Value> {
        requests
            .iter()
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = TraceClient::new(ClientConfig::default().with_service(""));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn http_client_has_no_connection_state() {
        let client = TraceClient::new(ClientConfig::default()).unwrap();
        assert_eq!(client.transport(), Transport::Http);
        assert!(client.connection_state().is_none());
        assert!(client.events().is_none());
    }

    #[tokio::test]
    async fn http_log_posts_normalized_entry() {
        let server = ingest_server().await;
        let client = TraceClient::new(http_config(&server)).unwrap();

        client
            .log(
                LogRecord::new()
                    .message("Custom log with trace ID")
                    .trace_id("trace-12345")
                    .session_id("session-abc")
                    .meta("userId", 123),
            )
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = &bodies(&requests)[0];
        assert_eq!(body["level"], json!("INFO"));
        assert_eq!(body["service"], json!("test-service"));
        assert_eq!(body["traceId"], json!("trace-12345"));
        assert_eq!(body["sessionId"], json!("session-abc"));
        assert_eq!(body["userId"], json!(123));
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn convenience_methods_set_level() {
        let server = ingest_server().await;
        let client = TraceClient::new(http_config(&server)).unwrap();

        client.info("Info message").await.unwrap();
        client.warn("Warning message").await.unwrap();
        client.error("Error message").await.unwrap();
        client.debug("Debug message").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let levels: Vec<Value> = bodies(&requests).iter().map(|b| b["level"].clone()).collect();
        assert_eq!(
            levels,
            vec![json!("INFO"), json!("WARN"), json!("ERROR"), json!("DEBUG")]
        );
    }

    #[tokio::test]
    async fn convenience_options_take_precedence() {
        let server = ingest_server().await;
        let client = TraceClient::new(http_config(&server)).unwrap();

        client
            .debug_with(
                "Debug information",
                LogRecord::new()
                    .level("TRACE")
                    .meta("debugData", "some debug info"),
            )
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = &bodies(&requests)[0];
        assert_eq!(body["level"], json!("TRACE"));
        assert_eq!(body["message"], json!("Debug information"));
        assert_eq!(body["debugData"], json!("some debug info"));
    }

    #[tokio::test]
    async fn unknown_transport_behaves_like_http() {
        let server = ingest_server().await;
        let mut config = http_config(&server);
        config.transport = Transport::parse_lenient("smoke-signals");
        let client = TraceClient::new(config).unwrap();

        client.info("via fallback").await.unwrap();

        assert_eq!(client.transport(), Transport::Http);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ws_entries_before_open_are_queued_then_delivered_in_order() {
        let connector = GatedConnector::default();
        let config = ClientConfig::default().with_transport(Transport::Ws);
        let client = TraceClient::with_connector(config, connector.clone()).unwrap();

        let a = client.info("a");
        let b = client.info("b");
        assert_eq!(client.queued().await, 2);
        assert_eq!(client.connection_state(), Some(ConnectionState::Connecting));

        connector.gate.notify_one();
        a.await.unwrap();
        b.await.unwrap();

        let frames = connector.frames.lock().unwrap().clone();
        let messages: Vec<&str> = frames.iter().filter_map(|f| f["message"].as_str()).collect();
        assert_eq!(messages, vec!["a", "b"]);
        assert_eq!(client.connection_state(), Some(ConnectionState::Connected));
    }

    #[tokio::test]
    async fn http_delivery_is_sent_without_being_awaited() {
        let server = ingest_server().await;
        let client = TraceClient::new(http_config(&server)).unwrap();

        let a = client.info("a");
        while server.received_requests().await.unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
        let b = client.info("b");
        b.await.unwrap();
        a.await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let messages: Vec<Value> = bodies(&requests).iter().map(|b| b["message"].clone()).collect();
        assert_eq!(messages, vec![json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn ws_client_is_connecting_right_after_construction() {
        let config = ClientConfig::default().with_transport(Transport::Ws);
        let client = TraceClient::with_connector(config, GatedConnector::default()).unwrap();

        assert_eq!(client.connection_state(), Some(ConnectionState::Connecting));
        client.close().await;
    }

    #[tokio::test]
    async fn default_queue_keeps_every_entry_until_open() {
        let connector = GatedConnector::default();
        let config = ClientConfig::default().with_transport(Transport::Ws);
        let client = TraceClient::with_connector(config, connector.clone()).unwrap();

        let first = client.info("first");
        let rest: Vec<Delivery> = (0..10_000).map(|i| client.info(i.to_string())).collect();
        assert_eq!(client.queued().await, 10_001);

        connector.gate.notify_one();
        first.await.unwrap();
        for delivery in rest {
            delivery.await.unwrap();
        }

        let frames = connector.frames.lock().unwrap();
        assert_eq!(frames.len(), 10_001);
        assert_eq!(frames[0]["message"], json!("first"));
        assert_eq!(frames[10_000]["message"], json!("9999"));
    }

    #[tokio::test]
    async fn http_close_is_noop() {
        let client = TraceClient::new(ClientConfig::default()).unwrap();
        client.close().await;
        assert_eq!(client.queued().await, 0);
    }

    #[tokio::test]
    async fn ws_close_rejects_pending_entries() {
        let connector = GatedConnector::default();
        let config = ClientConfig::default().with_transport(Transport::Ws);
        let client = TraceClient::with_connector(config, connector).unwrap();

        let pending = client.warn("never delivered");
        client.close().await;

        assert!(matches!(pending.await, Err(ClientError::Closed)));
        assert!(matches!(client.info("late").await, Err(ClientError::Closed)));
    }
}
