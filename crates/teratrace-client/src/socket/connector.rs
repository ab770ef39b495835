//! Connection seam of the socket sender.
//!
//! [`Connector`] opens connections and [`Connection`] carries text frames.
//! [`WsConnector`] is the production implementation over
//! `tokio-tungstenite`; tests substitute scripted implementations.

use std::future::Future;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{ClientError, Result};

/// Opens persistent connections to the collector.
pub trait Connector: Send + Sync + 'static {
    /// Connection type produced by this connector.
    type Connection: Connection;

    /// Opens a connection to `url`.
    fn connect(&self, url: &str) -> impl Future<Output = Result<Self::Connection>> + Send;
}

/// An open, bidirectional text-frame connection.
pub trait Connection: Send + 'static {
    /// Writes one text frame. Resolves once the frame has been flushed.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<()>> + Send;

    /// Waits for the next inbound text frame.
    ///
    /// Returns `None` once the connection is closed, `Some(Err(_))` when it
    /// failed.
    fn recv(&mut self) -> impl Future<Output = Option<Result<String>>> + Send;

    /// Closes the connection.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Connector using `tokio_tungstenite::connect_async`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    type Connection = WsConnection;

    async fn connect(&self, url: &str) -> Result<WsConnection> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ClientError::SocketConnect(e.to_string()))?;
        Ok(WsConnection { stream })
    }
}

/// A WebSocket connection to the collector.
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl std::fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnection").finish_non_exhaustive()
    }
}

impl Connection for WsConnection {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| ClientError::SocketWrite(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Collector closed the connection");
                    return None;
                }
                // Ping/pong are answered by tungstenite; binary frames carry nothing for us
                Ok(_) => {}
                Err(e) => return Some(Err(ClientError::SocketConnect(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "Error while closing collector connection");
        }
    }
}
