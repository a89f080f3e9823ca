//! CLI module for fairtrail
//!
//! Provides command-line interface for:
//! - init: Create the data directory and empty stores
//! - serve: HTTP API plus the periodic auditor
//! - audit: One-shot audit over the decision log
//! - verify: Offline receipt verification from stdin

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{audit, audit_once, init, run, run_command, serve, verify, verify_document};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_document, read_request, write_response};
