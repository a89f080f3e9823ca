//! JSON I/O handling for CLI
//!
//! - Input: one JSON document on stdin (may span lines)
//! - Output: one JSON object per line on stdout

use std::io::{self, Read, Write};

use serde::Serialize;
use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read a JSON document from a reader
pub fn read_document(mut input: impl Read) -> CliResult<Value> {
    let mut content = String::new();
    input.read_to_string(&mut content)?;

    if content.trim().is_empty() {
        return Err(CliError::Io("Empty input".into()));
    }

    let value: Value = serde_json::from_str(&content)?;
    Ok(value)
}

/// Read a JSON document from stdin
pub fn read_request() -> CliResult<Value> {
    read_document(io::stdin().lock())
}

/// Write a success response to stdout
pub fn write_response(data: impl Serialize) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
