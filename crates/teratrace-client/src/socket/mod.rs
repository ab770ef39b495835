//! Persistent WebSocket transport.
//!
//! Holds the connection to the collector's `/ws` endpoint, queues entries
//! while it is unavailable and reconnects after a fixed delay.

mod connector;
mod events;
mod queue;
mod sender;
mod state;

pub use connector::{Connection, Connector, WsConnection, WsConnector};
pub use events::SocketEvent;
pub use sender::{SocketSender, SocketSettings};
pub use state::{AtomicConnectionState, ConnectionState};
