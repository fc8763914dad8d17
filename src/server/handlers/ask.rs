use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::retrieval::SourceRef;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_error: Option<String>,
    pub results: Vec<SourceRef>,
}

/// Answer a free-text legal query against the indexed corpus.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let outcome = state.pipeline.answer(&req.query).await?;

    Ok(Json(AskResponse {
        answer: outcome.answer,
        generation_error: outcome.generation_error,
        results: outcome.sources,
    }))
}
