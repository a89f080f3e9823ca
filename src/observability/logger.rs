//! JSON-lines event log
//!
//! Each record is one line: `event`, `severity` and `ts` first, then the
//! caller's fields in key order. Values are escaped by `serde_json`.
//! Records below the process-wide minimum severity are dropped; ERROR and
//! FATAL go to stderr, the rest to stdout.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Skipped computations and other detail
    Trace = 0,
    Info = 1,
    /// Retries and skipped ticks
    Warn = 2,
    Error = 3,
    /// The audit trail can no longer be trusted
    Fatal = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Info
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Info as u8);

/// Process-wide event logger
pub struct Logger;

impl Logger {
    /// Drops every later record below `severity`.
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::min_severity()
    }

    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        let line = render(severity, event, &timestamp(), fields);
        if severity >= Severity::Error {
            emit(&mut io::stderr().lock(), &line);
        } else {
            emit(&mut io::stdout().lock(), &line);
        }
    }

    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }

    pub fn fatal(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Fatal, event, fields);
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// One `write_all` per record; sink failures are ignored.
fn emit<W: Write>(writer: &mut W, line: &str) {
    let _ = writer.write_all(line.as_bytes());
    let _ = writer.flush();
}

fn push_pair(out: &mut String, key: &str, value: &str) {
    // Serializing a str cannot fail
    out.push_str(&serde_json::to_string(key).unwrap_or_default());
    out.push(':');
    out.push_str(&serde_json::to_string(value).unwrap_or_default());
}

fn render(severity: Severity, event: &str, ts: &str, fields: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(128 + fields.len() * 32);
    out.push('{');
    push_pair(&mut out, "event", event);
    out.push(',');
    push_pair(&mut out, "severity", severity.as_str());
    out.push(',');
    push_pair(&mut out, "ts", ts);

    let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
    sorted.sort_by_key(|(key, _)| *key);
    for (key, value) in sorted {
        out.push(',');
        push_pair(&mut out, key, value);
    }
    out.push_str("}\n");
    out
}
