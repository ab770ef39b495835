//! Client configuration.
//!
//! Configuration for the collector client, including:
//! - Collector endpoint (host and the two ports)
//! - Default service name
//! - Transport selection
//! - Reconnection and pending-queue behavior of the WebSocket transport

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::{ClientError, Result};

/// Default collector host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default port of the HTTP ingestion endpoint.
pub const DEFAULT_HTTP_PORT: u16 = 8090;
/// Default port of the WebSocket endpoint.
pub const DEFAULT_WS_PORT: u16 = 8081;
/// Default service name stamped on entries.
pub const DEFAULT_SERVICE: &str = "node-app";
/// Timeout applied to each ingestion request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
/// Fixed delay before a reconnection attempt.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;

/// How entries reach the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Transport {
    /// One `POST /ingest` request per entry.
    #[default]
    Http,
    /// A persistent WebSocket connection to `/ws`.
    Ws,
}

impl Transport {
    /// Parses a transport name, falling back to [`Transport::Http`] for
    /// anything other than `"ws"`.
    #[must_use]
    pub fn parse_lenient(name: &str) -> Self {
        match name {
            "ws" => Self::Ws,
            "http" => Self::Http,
            other => {
                warn!(transport = %other, "Unknown transport, falling back to http");
                Self::Http
            }
        }
    }

    /// Returns the configuration name of this transport.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Ws => "ws",
        }
    }
}

impl std::str::FromStr for Transport {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "http" => Ok(Self::Http),
            "ws" => Ok(Self::Ws),
            other => Err(ClientError::Config(format!(
                "unknown transport '{other}', expected 'http' or 'ws'"
            ))),
        }
    }
}

impl From<String> for Transport {
    fn from(s: String) -> Self {
        Self::parse_lenient(&s)
    }
}

impl From<Transport> for String {
    fn from(t: Transport) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the pending queue does when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest pending entry to make room.
    #[default]
    DropOldest,
    /// Reject the incoming entry.
    RejectNew,
}

/// Bounds of the WebSocket pending queue.
///
/// Unbounded unless `capacity` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of pending entries (`None` = unbounded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
    /// Policy applied when `capacity` is reached.
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

impl QueueConfig {
    /// A queue without a capacity limit.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            capacity: None,
            overflow: OverflowPolicy::DropOldest,
        }
    }

    /// A queue holding at most `capacity` entries.
    #[must_use]
    pub const fn bounded(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            capacity: Some(capacity),
            overflow,
        }
    }
}

/// Main client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Collector host name or address.
    pub host: String,
    /// Port of the HTTP ingestion endpoint.
    pub http_port: u16,
    /// Port of the WebSocket endpoint.
    pub ws_port: u16,
    /// Service name applied to entries that do not carry one.
    pub service: String,
    /// Transport used for delivery.
    pub transport: Transport,
    /// Whether the WebSocket transport reconnects after a failure.
    pub auto_reconnect: bool,
    /// Timeout of each ingestion request, in milliseconds.
    pub request_timeout_ms: u64,
    /// Fixed back-off before a reconnection attempt, in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Pending queue bounds.
    pub queue: QueueConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            ws_port: DEFAULT_WS_PORT,
            service: DEFAULT_SERVICE.to_string(),
            transport: Transport::Http,
            auto_reconnect: true,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            queue: QueueConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Sets the collector host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the HTTP ingestion port.
    #[must_use]
    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    /// Sets the WebSocket port.
    #[must_use]
    pub fn with_ws_port(mut self, port: u16) -> Self {
        self.ws_port = port;
        self
    }

    /// Sets the default service name.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Selects the transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Enables or disables automatic reconnection.
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Sets the ingestion request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Sets the reconnection back-off.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the pending queue bounds.
    #[must_use]
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    /// Ingestion request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Reconnection back-off.
    #[must_use]
    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// URL of the HTTP ingestion endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not form a valid URL.
    pub fn ingest_url(&self) -> Result<Url> {
        endpoint("http", &self.host, self.http_port, "/ingest")
    }

    /// URL of the WebSocket endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not form a valid URL.
    pub fn socket_url(&self) -> Result<Url> {
        endpoint("ws", &self.host, self.ws_port, "/ws")
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ClientError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ClientError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(ClientError::Config("host cannot be empty".to_string()));
        }

        if self.http_port == 0 {
            return Err(ClientError::Config(
                "http_port must be greater than 0".to_string(),
            ));
        }

        if self.ws_port == 0 {
            return Err(ClientError::Config(
                "ws_port must be greater than 0".to_string(),
            ));
        }

        if self.service.is_empty() {
            return Err(ClientError::Config("service cannot be empty".to_string()));
        }

        if self.request_timeout_ms == 0 {
            return Err(ClientError::Config(
                "request_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.reconnect_delay_ms == 0 {
            return Err(ClientError::Config(
                "reconnect_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.queue.capacity == Some(0) {
            return Err(ClientError::Config(
                "queue.capacity must be greater than 0".to_string(),
            ));
        }

        self.ingest_url()?;
        self.socket_url()?;

        Ok(())
    }
}

fn endpoint(scheme: &str, host: &str, port: u16, path: &str) -> Result<Url> {
    // IPv6 literals need brackets in a URL authority
    let raw = if host.contains(':') && !host.starts_with('[') {
        format!("{scheme}://[{host}]:{port}{path}")
    } else {
        format!("{scheme}://{host}:{port}{path}")
    };
    let url = Url::parse(&raw)
        .map_err(|e| ClientError::Config(format!("invalid endpoint '{raw}': {e}")))?;

    if url.path() != path {
        return Err(ClientError::Config(format!(
            "host '{host}' must not contain a path"
        )));
    }

    Ok(url)
}
