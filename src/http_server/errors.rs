//! HTTP error responses
//!
//! Every handler error renders as `(StatusCode, Json<ErrorResponse>)`.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::counterfactual::CounterfactualError;
use crate::decision_log::{LogError, LogErrorCode};
use crate::fairness::FairnessError;
use crate::receipts::ReceiptError;
use crate::scheduler::AuditJobError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    /// The same request may succeed later
    pub retryable: bool,
}

/// A handler failure
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(code: u16, message: impl Into<String>, retryable: bool) -> Self {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            body: ErrorResponse {
                error: message.into(),
                code: status.as_u16(),
                retryable,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message, false)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message, false)
    }

    /// A storage call exceeded its deadline
    pub fn storage_timeout(limit: Duration) -> Self {
        Self::new(
            503,
            format!("storage did not respond within {} ms", limit.as_millis()),
            true,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorResponse {
        &self.body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<LogError> for ApiError {
    fn from(e: LogError) -> Self {
        let code = match e.code() {
            LogErrorCode::Validation => 400,
            LogErrorCode::NotFound => 404,
            LogErrorCode::IoError | LogErrorCode::WriteFailed => 503,
            LogErrorCode::Corruption | LogErrorCode::Unusable | LogErrorCode::Internal => 500,
        };
        Self::new(code, e.to_string(), e.is_transient())
    }
}

impl From<ReceiptError> for ApiError {
    fn from(e: ReceiptError) -> Self {
        Self::new(e.status_code(), e.to_string(), e.is_retryable())
    }
}

impl From<FairnessError> for ApiError {
    fn from(e: FairnessError) -> Self {
        let code = e.status_code();
        Self::new(code, e.to_string(), code == 503)
    }
}

impl From<AuditJobError> for ApiError {
    fn from(e: AuditJobError) -> Self {
        let code = e.status_code();
        Self::new(code, e.to_string(), matches!(code, 409 | 503))
    }
}

impl From<CounterfactualError> for ApiError {
    fn from(e: CounterfactualError) -> Self {
        Self::new(e.status_code(), e.to_string(), false)
    }
}
