//! Receipt HTTP Routes
//!
//! Generation, proof and verification of receipts, plus the consent flags
//! that decide which inputs a receipt discloses.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::receipts::{ConsentRecord, ProofClaim, Receipt, ReceiptProof, VerificationResult};

use super::errors::ApiError;
use super::state::AppState;

/// `POST /receipts/verify` body
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    /// The receipt exactly as the subject holds it
    pub receipt: Value,
    #[serde(default)]
    pub proof: Option<ProofClaim>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptsListResponse {
    pub receipts: Vec<Receipt>,
    pub total: usize,
}

/// `POST /consent` body
#[derive(Debug, Clone, Deserialize)]
pub struct ConsentUpdate {
    pub subject_id: String,
    pub feature: String,
    pub allowed: bool,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsentListResponse {
    pub consents: Vec<ConsentRecord>,
    pub total: usize,
}

/// Create receipt routes
pub fn receipt_routes(state: AppState) -> Router {
    Router::new()
        .route("/generate/:decision_id", post(generate_handler))
        .route("/subject/:subject_id", get(list_for_subject_handler))
        .route("/verify", post(verify_handler))
        .route("/prove", post(prove_handler))
        .with_state(state)
}

/// Create consent routes
pub fn consent_routes(state: AppState) -> Router {
    Router::new()
        .route("/", post(update_consent_handler))
        .route("/:subject_id", get(list_consent_handler))
        .with_state(state)
}

async fn generate_handler(
    State(state): State<AppState>,
    Path(decision_id): Path<u64>,
) -> Result<(StatusCode, Json<Receipt>), ApiError> {
    let receipts = state.receipts.clone();
    let receipt = state
        .blocking(move || {
            receipts
                .generate_anchored(decision_id)
                .map_err(ApiError::from)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn list_for_subject_handler(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<ReceiptsListResponse>, ApiError> {
    let receipts = state.receipts.clone();
    let receipts = state
        .blocking(move || {
            receipts
                .list_for_subject(&subject_id)
                .map_err(ApiError::from)
        })
        .await?;
    Ok(Json(ReceiptsListResponse {
        total: receipts.len(),
        receipts,
    }))
}

async fn verify_handler(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Json<VerificationResult> {
    Json(state.receipts.verify(&request.receipt, request.proof.as_ref()))
}

async fn prove_handler(
    State(state): State<AppState>,
    Json(receipt): Json<Receipt>,
) -> Result<Json<ReceiptProof>, ApiError> {
    let receipts = state.receipts.clone();
    let proof = state
        .blocking(move || receipts.prove(&receipt).map_err(ApiError::from))
        .await?;
    Ok(Json(proof))
}

async fn update_consent_handler(
    State(state): State<AppState>,
    Json(update): Json<ConsentUpdate>,
) -> Result<StatusCode, ApiError> {
    if update.subject_id.trim().is_empty() || update.feature.trim().is_empty() {
        return Err(ApiError::bad_request(
            "subject_id and feature must not be empty",
        ));
    }
    let consent = state.consent.clone();
    state
        .blocking(move || {
            consent
                .set(&update.subject_id, &update.feature, update.allowed, update.expiry)
                .map_err(ApiError::from)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_consent_handler(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<ConsentListResponse>, ApiError> {
    let consents = state.consent.for_subject(&subject_id)?;
    Ok(Json(ConsentListResponse {
        total: consents.len(),
        consents,
    }))
}
