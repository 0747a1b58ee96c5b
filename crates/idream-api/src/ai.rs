use std::sync::Arc;

use axum::{Extension, Json, extract::State};

use idream_ai::IdeaAssistant;
use idream_types::api::{Claims, RefineRequest, RefineResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::ideas::TEXT_MAX;

const REFINE_MIN_CHARS: usize = 10;

pub(crate) fn assistant(state: &AppState) -> Result<Arc<dyn IdeaAssistant>, ApiError> {
    state.assistant.clone().ok_or(ApiError::AiUnavailable)
}

/// Refine free text that is not (yet) stored as an idea.
pub async fn refine(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<RefineRequest>,
) -> Result<Json<RefineResponse>, ApiError> {
    let idea = req.idea.trim();
    let len = idea.chars().count();
    if len < REFINE_MIN_CHARS {
        return Err(ApiError::bad_request(format!(
            "idea must be at least {} characters",
            REFINE_MIN_CHARS
        )));
    }
    if len > TEXT_MAX {
        return Err(ApiError::bad_request(format!(
            "idea must be at most {} characters",
            TEXT_MAX
        )));
    }

    let assistant = assistant(&state)?;
    Ok(Json(assistant.refine_idea(idea).await?))
}
