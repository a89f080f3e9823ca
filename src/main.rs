//! fairtrail CLI entry point
//!
//! Parses arguments and dispatches into the `cli` module. Failures are
//! printed as `CODE: message` and mapped to a sysexits-style status.

use std::process::ExitCode;

use fairtrail::cli;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.report());
            e.exit_code()
        }
    }
}
