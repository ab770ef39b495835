//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use teratrace_client::{ClientConfig, Transport};

use crate::error::CliError;

/// TeraTrace CLI - forward log entries to a collector.
#[derive(Parser, Debug, Clone)]
#[command(name = "teratrace")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "TERATRACE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Collector host.
    #[arg(long, env = "TERATRACE_HOST")]
    pub host: Option<String>,

    /// Collector HTTP ingestion port.
    #[arg(long, env = "TERATRACE_HTTP_PORT")]
    pub http_port: Option<u16>,

    /// Collector WebSocket port.
    #[arg(long, env = "TERATRACE_WS_PORT")]
    pub ws_port: Option<u16>,

    /// Service name stamped on entries.
    #[arg(short, long, env = "TERATRACE_SERVICE")]
    pub service: Option<String>,

    /// Transport used to deliver entries.
    #[arg(short, long, value_enum, env = "TERATRACE_TRANSPORT")]
    pub transport: Option<TransportArg>,

    /// Format of diagnostic output on stderr.
    #[arg(long, value_enum, env = "TERATRACE_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Builds the client configuration: file (or defaults), then flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the result is invalid.
    pub fn client_config(&self) -> Result<ClientConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };

        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
        if let Some(port) = self.ws_port {
            config.ws_port = port;
        }
        if let Some(service) = &self.service {
            config.service.clone_from(service);
        }
        if let Some(transport) = self.transport {
            config.transport = transport.into();
        }

        config.validate()?;
        Ok(config)
    }
}

/// Transport choices accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    /// One POST per entry.
    Http,
    /// Persistent WebSocket connection.
    Ws,
}

impl From<TransportArg> for Transport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Http => Self::Http,
            TransportArg::Ws => Self::Ws,
        }
    }
}

/// Diagnostic output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Send a single entry.
    Send(SendArgs),

    /// Forward stdin, one entry per line.
    ///
    /// Lines holding a JSON object are sent as full records; any other
    /// line becomes the message of an entry at `--level`.
    Pipe(PipeArgs),

    /// Check that both collector endpoints are reachable.
    Check,
}

/// Arguments for the send command.
#[derive(Args, Debug, Clone)]
pub struct SendArgs {
    /// Severity level.
    #[arg(short, long, default_value = "INFO")]
    pub level: String,

    /// Message text.
    #[arg(short, long)]
    pub message: Option<String>,

    /// Trace identifier.
    #[arg(long)]
    pub trace_id: Option<String>,

    /// Session identifier.
    #[arg(long)]
    pub session_id: Option<String>,

    /// Metadata field, repeatable. Values are parsed as JSON, else kept as text.
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
    pub meta: Vec<(String, Value)>,
}

/// Arguments for the pipe command.
#[derive(Args, Debug, Clone)]
pub struct PipeArgs {
    /// Level for lines that do not carry one.
    #[arg(short, long, default_value = "INFO")]
    pub level: String,
}

/// Parses a `KEY=VALUE` metadata argument.
///
/// # Errors
///
/// Returns an error if there is no `=` or the key is empty.
pub fn parse_meta(arg: &str) -> Result<(String, Value), String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{arg}`"))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{arg}`"));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
