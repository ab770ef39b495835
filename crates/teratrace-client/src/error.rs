//! Error types for the collector client.

use thiserror::Error;

/// Errors that can occur while delivering log entries.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The request channel failed: timeout, refused connection, or a
    /// non-2xx response from the ingestion endpoint.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The persistent connection could not be established.
    #[error("socket connection failed: {0}")]
    SocketConnect(String),

    /// Writing an entry to an open persistent connection failed.
    #[error("socket write failed: {0}")]
    SocketWrite(String),

    /// The entry could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The pending queue is full and rejects new entries.
    #[error("pending queue full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The entry was evicted from the pending queue to make room for a newer one.
    #[error("entry evicted from pending queue")]
    Evicted,

    /// The client was closed before the entry could be delivered.
    #[error("client closed")]
    Closed,

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// HTTP status returned by the ingestion endpoint, if the failure carried one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if the failure was a request-channel timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = ClientError::Config("host cannot be empty".to_string());
        assert_eq!(err.to_string(), "configuration error: host cannot be empty");

        let err = ClientError::SocketConnect("connection refused".to_string());
        assert_eq!(err.to_string(), "socket connection failed: connection refused");

        let err = ClientError::SocketWrite("broken pipe".to_string());
        assert_eq!(err.to_string(), "socket write failed: broken pipe");

        let err = ClientError::QueueFull { capacity: 16 };
        assert_eq!(err.to_string(), "pending queue full (capacity 16)");

        assert_eq!(ClientError::Evicted.to_string(), "entry evicted from pending queue");
        assert_eq!(ClientError::Closed.to_string(), "client closed");
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ClientError = io_err.into();
        assert!(err.to_string().contains("io error"));
    }

    #[test]
    fn serialization_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ClientError = json_err.into();
        assert!(matches!(err, ClientError::Serialization(_)));
    }

    #[test]
    fn status_only_for_transport_errors() {
        assert_eq!(ClientError::Closed.status(), None);
        assert!(!ClientError::Closed.is_timeout());
    }
}
