//! # fairtrail HTTP Server Module
//!
//! Axum server exposing the decision log, receipts, audits and the what-if
//! search. One router per subsystem, merged in `server.rs`.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/decisions/*` - Decision intake and lookup
//! - `/receipts/*` - Receipt generation, proof and verification
//! - `/consent` - Per-subject disclosure grants
//! - `/audit/*` - Incidents and on-demand audits
//! - `/what-if` - Counterfactual search
//! - `/observability/*` - Metrics

pub mod audit_routes;
pub mod decision_routes;
pub mod errors;
pub mod observability_routes;
pub mod receipt_routes;
pub mod server;
pub mod state;
pub mod whatif_routes;

pub use errors::{ApiError, ErrorResponse};
pub use server::{build_router, HttpServer};
pub use state::{AppState, StateError};
