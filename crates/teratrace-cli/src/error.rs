//! CLI error types.

use teratrace_client::ClientError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Client configuration or delivery failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Some entries read from stdin were not delivered.
    #[error("{failed} of {total} entries failed")]
    Delivery {
        /// Entries that failed.
        failed: usize,
        /// Entries attempted.
        total: usize,
    },

    /// One or more endpoints were unreachable.
    #[error("connectivity check failed: {0}")]
    Check(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
