//! CLI argument definitions using clap
//!
//! Commands:
//! - fairtrail init --config <path>
//! - fairtrail serve --config <path>
//! - fairtrail audit --config <path>
//! - fairtrail verify < receipt.json

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fairtrail - verifiable receipts and fairness audits for automated decisions
#[derive(Parser, Debug)]
#[command(name = "fairtrail")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./fairtrail.json")]
        config: PathBuf,
    },

    /// Start the HTTP API and the periodic auditor
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./fairtrail.json")]
        config: PathBuf,

        /// Override the configured HTTP port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run one audit over the decision log and print the report
    Audit {
        /// Path to configuration file
        #[arg(long, default_value = "./fairtrail.json")]
        config: PathBuf,
    },

    /// Verify a `{receipt, proof}` JSON document read from stdin
    Verify,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
