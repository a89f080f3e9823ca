//! Audit HTTP Routes

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::fairness::{AuditReport, Incident};
use crate::scheduler::{AuditOutcome, AuditTask};

use super::errors::ApiError;
use super::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct IncidentsListResponse {
    pub incidents: Vec<Incident>,
    pub total: usize,
}

/// Create audit routes
pub fn audit_routes(state: AppState) -> Router {
    Router::new()
        .route("/incidents", get(list_incidents_handler))
        .route("/run", post(run_audit_handler))
        .with_state(state)
}

async fn list_incidents_handler(
    State(state): State<AppState>,
) -> Result<Json<IncidentsListResponse>, ApiError> {
    let store = state.incidents.clone();
    let incidents = state
        .blocking(move || store.list().map_err(ApiError::from))
        .await?;
    Ok(Json(IncidentsListResponse {
        total: incidents.len(),
        incidents,
    }))
}

/// Runs the same job the scheduler runs, once, and returns its report.
async fn run_audit_handler(State(state): State<AppState>) -> Result<Json<AuditReport>, ApiError> {
    let job = state.audit.clone();
    let outcome = state
        .blocking(move || job.run().map_err(ApiError::from))
        .await?;
    match outcome {
        AuditOutcome::Empty => Err(ApiError::bad_request("no decisions to audit")),
        AuditOutcome::Completed(report) => Ok(Json(report)),
    }
}
