//! fairtrail - a verifiable audit trail for automated decisions
//!
//! Decisions are appended to a content-hashed log. Each decision can be
//! turned into a receipt that is anchored under a Merkle root and checked
//! offline. A scheduled auditor measures group parity and drift over the
//! log, and a what-if search finds single-feature changes that flip an
//! outcome.

pub mod cli;
pub mod config;
pub mod counterfactual;
pub mod decision_log;
pub mod fairness;
pub mod hashing;
pub mod http_server;
pub mod journal;
pub mod merkle;
pub mod observability;
pub mod receipts;
pub mod retry;
pub mod scheduler;
