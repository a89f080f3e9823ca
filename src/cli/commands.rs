//! CLI command implementations
//!
//! `serve` boot order: configuration, stores (the decision log is replayed
//! and verified while opening), scheduler, HTTP listener. Any failure before
//! the listener is up stops the process.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::Config;
use crate::decision_log::DECISIONS_FILE;
use crate::http_server::receipt_routes::VerifyRequest;
use crate::http_server::{AppState, HttpServer};
use crate::observability::{log_event, log_event_with_fields, Event, Logger, MetricsRegistry};
use crate::receipts::{verify_receipt, VerificationResult};
use crate::scheduler::{AuditOutcome, AuditScheduler, AuditTask};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Serve { config, port } => serve(&config, port),
        Command::Audit { config } => audit(&config),
        Command::Verify => verify(),
    }
}

/// Initialize a new data directory
///
/// Creates the directory and empty stores. Does not start anything.
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.log.level);
    let data_dir = config.data_path();

    if is_initialized(data_dir) {
        return Err(CliError::AlreadyInitialized(data_dir.to_path_buf()));
    }

    fs::create_dir_all(data_dir).map_err(|source| CliError::DataDir {
        path: data_dir.to_path_buf(),
        source,
    })?;
    AppState::open(&config, Arc::new(MetricsRegistry::new()))?;

    write_response(json!({"initialized": true, "data_dir": data_dir}))?;

    Ok(())
}

/// Start the HTTP API and the periodic audit scheduler
///
/// Runs until Ctrl-C. The scheduler is stopped after the listener closes;
/// an audit already running is allowed to finish.
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = load_initialized(config_path)?;
    if let Some(port) = port {
        config.http.port = port;
    }

    log_event(Event::BootStart);
    let metrics = Arc::new(MetricsRegistry::new());
    let state = AppState::open(&config, metrics.clone())?;
    let records = state
        .log
        .len()
        .map_err(|e| CliError::Boot(format!("Failed to read decision log: {}", e)))?;
    log_event_with_fields(Event::BootComplete, &[("records", &records.to_string())]);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Boot(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let scheduler = AuditScheduler::new(config.audit_period())
            .with_metrics(metrics)
            .spawn(state.audit.clone());

        let server = HttpServer::new(config.socket_addr(), state, &config.http.cors_origins);
        let served = server
            .start(async {
                let _ = tokio::signal::ctrl_c().await;
                log_event(Event::ShutdownStart);
            })
            .await;

        let stats = scheduler.shutdown().await;
        log_event_with_fields(
            Event::SchedulerStopped,
            &[
                ("runs_completed", &stats.runs_completed.to_string()),
                ("ticks_skipped", &stats.ticks_skipped.to_string()),
            ],
        );

        served.map_err(|e| CliError::Boot(format!("HTTP server failed: {}", e)))
    })
}

/// Run one audit and print the report
pub fn audit(config_path: &Path) -> CliResult<()> {
    let config = load_initialized(config_path)?;
    let data = match audit_once(&config)? {
        AuditOutcome::Empty => json!({"audited": false, "reason": "no decisions"}),
        AuditOutcome::Completed(report) => json!({"audited": true, "report": report}),
    };
    write_response(data)
}

/// Verify a receipt read from stdin
///
/// Prints the verification result, then fails if it did not verify.
pub fn verify() -> CliResult<()> {
    let result = verify_document(read_request()?)?;
    let verified = result.verified;
    write_response(&result)?;
    if !verified {
        return Err(CliError::NotVerified);
    }
    Ok(())
}

/// Opens the stores and runs the audit job once.
pub fn audit_once(config: &Config) -> CliResult<AuditOutcome> {
    let state = AppState::open(config, Arc::new(MetricsRegistry::new()))?;
    Ok(state.audit.run()?)
}

/// Verifies a `{receipt, proof}` document.
pub fn verify_document(document: Value) -> CliResult<VerificationResult> {
    let request: VerifyRequest = serde_json::from_value(document)?;
    Ok(verify_receipt(&request.receipt, request.proof.as_ref()))
}

fn load_initialized(config_path: &Path) -> CliResult<Config> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.log.level);
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("path", &config_path.display().to_string())],
    );
    if !is_initialized(config.data_path()) {
        return Err(CliError::NotInitialized(config.data_dir.clone()));
    }
    Ok(config)
}

/// Check if a data directory is initialized
fn is_initialized(data_dir: &Path) -> bool {
    data_dir.join(DECISIONS_FILE).exists()
}
