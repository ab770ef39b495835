//! Stdin forwarding command.
//!
//! Each non-empty line becomes one entry. Lines holding a JSON object are
//! read as full records in wire form; anything else is the message of an
//! entry at the configured level.

use std::io::Write;

use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use teratrace_client::{ClientConfig, LogRecord, Result as ClientResult, TraceClient};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::cli::PipeArgs;
use crate::error::CliError;

/// Deliveries awaited concurrently before reading more input.
const MAX_IN_FLIGHT: usize = 64;

/// Delivery counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipeSummary {
    /// Entries the collector accepted.
    pub delivered: usize,
    /// Entries that failed.
    pub failed: usize,
}

impl PipeSummary {
    fn record(&mut self, outcome: ClientResult<()>) {
        match outcome {
            Ok(()) => self.delivered += 1,
            Err(e) => {
                warn!(error = %e, "Entry not delivered");
                self.failed += 1;
            }
        }
    }

    /// Entries attempted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Pipe command executor.
pub struct PipeCommand {
    config: ClientConfig,
}

impl PipeCommand {
    /// Create a new pipe command.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Forward every line of `input`, then print a summary.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or any entry was not delivered.
    pub async fn execute<R, W>(
        &self,
        input: R,
        writer: &mut W,
        args: &PipeArgs,
    ) -> Result<PipeSummary, CliError>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let client = TraceClient::new(self.config.clone())?;
        let summary = forward(&client, input, &args.level).await;
        client.close().await;
        let summary = summary?;

        writeln!(
            writer,
            "delivered: {}, failed: {}",
            summary.delivered, summary.failed
        )?;

        if summary.failed > 0 {
            return Err(CliError::Delivery {
                failed: summary.failed,
                total: summary.total(),
            });
        }
        Ok(summary)
    }
}

async fn forward<R>(client: &TraceClient, input: R, level: &str) -> Result<PipeSummary, CliError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut in_flight = FuturesUnordered::new();
    let mut summary = PipeSummary::default();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        in_flight.push(client.log(parse_line(&line, level)));

        if in_flight.len() >= MAX_IN_FLIGHT {
            if let Some(outcome) = in_flight.next().await {
                summary.record(outcome);
            }
        }
    }

    while let Some(outcome) = in_flight.next().await {
        summary.record(outcome);
    }
    Ok(summary)
}

/// Turns one input line into a record.
#[must_use]
pub fn parse_line(line: &str, level: &str) -> LogRecord {
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(line) {
        let mut record = LogRecord::from_json_object(object);
        record.level.get_or_insert_with(|| level.into());
        return record;
    }
    LogRecord::new().level(level).message(line)
}
