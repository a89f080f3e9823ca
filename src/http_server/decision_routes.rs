//! Decision HTTP Routes
//!
//! Intake and lookup of decision records.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::decision_log::{DecisionRecord, NewDecision};

use super::errors::ApiError;
use super::state::AppState;

/// Root of the Merkle tree over every record's content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRootResponse {
    pub root: String,
    pub records: usize,
}

/// Create decision routes
pub fn decision_routes(state: AppState) -> Router {
    Router::new()
        .route("/", post(append_decision_handler))
        .route("/merkle", get(ledger_root_handler))
        .route("/:id", get(get_decision_handler))
        .with_state(state)
}

async fn append_decision_handler(
    State(state): State<AppState>,
    Json(decision): Json<NewDecision>,
) -> Result<(StatusCode, Json<DecisionRecord>), ApiError> {
    let log = state.log.clone();
    let record = state
        .blocking(move || log.append(decision).map_err(ApiError::from))
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_decision_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<DecisionRecord>, ApiError> {
    let record = state.log.get(id)?;
    Ok(Json(record))
}

async fn ledger_root_handler(
    State(state): State<AppState>,
) -> Result<Json<LedgerRootResponse>, ApiError> {
    let hashes = state.log.content_hashes()?;
    Ok(Json(LedgerRootResponse {
        root: crate::merkle::root(&hashes),
        records: hashes.len(),
    }))
}
