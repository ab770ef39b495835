//! # teratrace-client
//!
//! Log forwarding client for the TeraTrace collector.
//!
//! This crate provides:
//!
//! - [`TraceClient`] - normalizes records and sends them to the collector
//! - [`LogRecord`] / [`LogEntry`] - partial input and normalized wire form
//! - [`ClientConfig`] - host, ports, service name and transport selection
//! - [`HttpSender`] - one POST per entry to `/ingest`
//! - [`SocketSender`] - persistent `/ws` connection with queueing and
//!   fixed-delay reconnection
//!
//! ## Example
//!
//! ```rust,no_run
//! use teratrace_client::{ClientConfig, LogRecord, TraceClient};
//!
//! # async fn example() -> teratrace_client::Result<()> {
//! let client = TraceClient::new(ClientConfig::default().with_service("checkout"))?;
//!
//! client.info("Application started").await?;
//! client
//!     .error_with(
//!         "Payment failed",
//!         LogRecord::new().trace_id("trace-12345").meta("orderId", 991),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod entry;
pub mod error;
pub mod http;
pub mod socket;

// Re-export main types
pub use client::{Delivery, TraceClient};
pub use config::{ClientConfig, OverflowPolicy, QueueConfig, Transport};
pub use entry::{LogEntry, LogRecord, Level, Normalizer, RESERVED_FIELDS};
pub use error::{ClientError, Result};
pub use http::HttpSender;
pub use socket::{
    Connection, ConnectionState, Connector, SocketEvent, SocketSender, SocketSettings,
    WsConnection, WsConnector,
};
