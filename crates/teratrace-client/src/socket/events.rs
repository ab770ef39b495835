//! Socket sender event types.

use std::time::Duration;

/// Lifecycle events emitted by the socket sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// A connection attempt started.
    Connecting {
        /// Attempt number since the last successful connection.
        attempt: u32,
    },
    /// The socket opened and the pending queue was drained.
    Connected,
    /// The connection failed or was lost.
    Disconnected {
        /// Reason for disconnection.
        reason: String,
    },
    /// A reconnection attempt was scheduled.
    ReconnectScheduled {
        /// Delay before the attempt.
        delay: Duration,
    },
    /// The sender was closed and will not reconnect.
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_event_variants() {
        let connecting = SocketEvent::Connecting { attempt: 2 };
        assert!(matches!(connecting, SocketEvent::Connecting { attempt: 2 }));

        let disconnected = SocketEvent::Disconnected {
            reason: "connection reset".to_string(),
        };
        if let SocketEvent::Disconnected { reason } = disconnected {
            assert_eq!(reason, "connection reset");
        } else {
            panic!("expected Disconnected");
        }

        let scheduled = SocketEvent::ReconnectScheduled {
            delay: Duration::from_secs(5),
        };
        if let SocketEvent::ReconnectScheduled { delay } = scheduled {
            assert_eq!(delay, Duration::from_secs(5));
        } else {
            panic!("expected ReconnectScheduled");
        }
    }
}
