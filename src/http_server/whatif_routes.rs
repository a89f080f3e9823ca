//! What-if HTTP Routes
//!
//! Counterfactual search against the serving decision rule. Stateless.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::counterfactual::CounterfactualResult;
use crate::decision_log::FeatureMap;

use super::errors::ApiError;
use super::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatIfResponse {
    pub input: FeatureMap,
    /// Outcome of the rule on the unmodified input
    pub decision: String,
    pub counterfactuals: Vec<CounterfactualResult>,
}

/// Create what-if routes
pub fn whatif_routes(state: AppState) -> Router {
    Router::new()
        .route("/", post(what_if_handler))
        .with_state(state)
}

async fn what_if_handler(
    State(state): State<AppState>,
    Json(input): Json<FeatureMap>,
) -> Result<Json<WhatIfResponse>, ApiError> {
    let counterfactuals = state.search.search(&input, state.rule.as_ref())?;
    state.metrics.increment_counterfactual_searches();
    Ok(Json(WhatIfResponse {
        decision: state.rule.decide(&input),
        input,
        counterfactuals,
    }))
}
