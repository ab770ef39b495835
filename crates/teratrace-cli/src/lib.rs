//! # teratrace-cli
//!
//! Command-line front end for the TeraTrace collector client.
//!
//! Provides commands for:
//! - Sending a single entry with level, trace and metadata fields
//! - Forwarding stdin as a stream of entries
//! - Checking that the collector's endpoints are reachable
//!
//! Connection settings come from an optional TOML file, overridden by
//! flags and `TERATRACE_*` environment variables.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;

pub use cli::{Cli, Commands, LogFormat, PipeArgs, SendArgs, TransportArg};
pub use error::CliError;
