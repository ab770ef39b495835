//! Single-entry send command.

use std::io::Write;

use teratrace_client::{ClientConfig, LogRecord, TraceClient};

use crate::cli::SendArgs;
use crate::error::CliError;

/// Send command executor.
pub struct SendCommand {
    config: ClientConfig,
}

impl SendCommand {
    /// Create a new send command.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Execute the send command.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is not delivered or output fails.
    pub async fn execute<W: Write>(&self, writer: &mut W, args: &SendArgs) -> Result<(), CliError> {
        let client = TraceClient::new(self.config.clone())?;
        let outcome = client.log(record_from(args)).await;
        client.close().await;
        outcome?;

        writeln!(
            writer,
            "sent {} entry via {}",
            args.level,
            client.transport()
        )?;
        Ok(())
    }
}

fn record_from(args: &SendArgs) -> LogRecord {
    let mut record = LogRecord::new().level(args.level.as_str());
    if let Some(message) = &args.message {
        record = record.message(message.as_str());
    }
    if let Some(trace_id) = &args.trace_id {
        record = record.trace_id(trace_id.as_str());
    }
    if let Some(session_id) = &args.session_id {
        record = record.session_id(session_id.as_str());
    }
    for (key, value) in &args.meta {
        record = record.meta(key.as_str(), value.clone());
    }
    record
}
