//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`send`] - Send a single entry
//! - [`pipe`] - Forward stdin line by line
//! - [`check`] - Collector connectivity check

pub mod check;
pub mod pipe;
pub mod send;

pub use check::CheckCommand;
pub use pipe::{PipeCommand, PipeSummary};
pub use send::SendCommand;
