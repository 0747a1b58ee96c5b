use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use idream_ai::CoachContext;
use idream_types::api::{
    ChatTurn, Claims, CoachRequest, CoachResponse, CreateIdeaRequest, NotesRequest, PremierRequest,
    PremierResponse, RefineResponse, UpdateIdeaRequest,
};
use idream_types::lifecycle;
use idream_types::models::{DreamIdea, IdeaSummary, Role, User};

use crate::access::{
    current_user, optional_field, require_owner, require_role, text_field, visible_idea, with_db,
};
use crate::ai::assistant;
use crate::auth::AppState;
use crate::error::ApiError;

const TITLE_MAX: usize = 200;
pub(crate) const TEXT_MAX: usize = 10_000;
const NOTES_MAX: usize = 20_000;
const COACH_MESSAGE_MAX: usize = 4_000;
const COACH_HISTORY_MAX: usize = 50;

pub async fn create_idea(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateIdeaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &claims).await?;
    require_role(&user, Role::Dreamer)?;

    let title = text_field("title", &req.title, TITLE_MAX)?;
    let text = text_field("original_text", &req.original_text, TEXT_MAX)?;

    let idea = with_db(&state, move |db| db.create_idea(user.id, &title, &text)).await?;
    info!("Idea {} created by {}", idea.id, claims.username);
    Ok((StatusCode::CREATED, Json(idea)))
}

pub async fn list_ideas(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<IdeaSummary>>, ApiError> {
    let user = current_user(&state, &claims).await?;
    require_role(&user, Role::Dreamer)?;

    let ideas = with_db(&state, move |db| db.list_ideas_by_owner(user.id)).await?;
    Ok(Json(ideas))
}

pub async fn get_idea(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DreamIdea>, ApiError> {
    let user = current_user(&state, &claims).await?;
    Ok(Json(visible_idea(&state, &user, idea_id).await?))
}

pub async fn update_idea(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateIdeaRequest>,
) -> Result<Json<DreamIdea>, ApiError> {
    let title = req
        .title
        .as_deref()
        .map(|t| text_field("title", t, TITLE_MAX))
        .transpose()?;
    let text = req
        .original_text
        .as_deref()
        .map(|t| text_field("original_text", t, TEXT_MAX))
        .transpose()?;
    if title.is_none() && text.is_none() {
        return Err(ApiError::bad_request("nothing to update"));
    }

    let owner = claims.sub;
    let idea = with_db(&state, move |db| {
        db.update_idea(idea_id, owner, title.as_deref(), text.as_deref())
    })
    .await?;
    Ok(Json(idea))
}

pub async fn submit_idea(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let owner = claims.sub;
    let status = with_db(&state, move |db| db.submit_idea(idea_id, owner)).await?;
    Ok(Json(serde_json::json!({ "idea_id": idea_id, "status": status })))
}

/// Runs the idea's original text through the assistant and stores the result.
/// Only private ideas can be refined.
pub async fn refine_idea(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<RefineResponse>, ApiError> {
    let assistant = assistant(&state)?;
    let user = current_user(&state, &claims).await?;
    let idea = owned_idea(&state, &user, idea_id).await?;
    lifecycle::ensure_editable(idea.status)?;

    let refined = assistant.refine_idea(&idea.original_text).await?;

    let (text, suggestions) = (refined.refined_idea.clone(), refined.suggestions.clone());
    with_db(&state, move |db| {
        db.apply_refinement(idea_id, user.id, &text, &suggestions)
    })
    .await?;
    info!("Idea {} refined ({} suggestions)", idea_id, refined.suggestions.len());
    Ok(Json(refined))
}

pub async fn coach(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CoachRequest>,
) -> Result<Json<CoachResponse>, ApiError> {
    let message = text_field("message", &req.message, COACH_MESSAGE_MAX)?;
    if req.history.len() > COACH_HISTORY_MAX {
        return Err(ApiError::bad_request(format!(
            "history must be at most {} turns",
            COACH_HISTORY_MAX
        )));
    }
    let history = req
        .history
        .into_iter()
        .map(|turn| {
            Ok(ChatTurn {
                role: turn.role,
                content: text_field("history content", &turn.content, COACH_MESSAGE_MAX)?,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;
    let assistant = assistant(&state)?;
    let user = current_user(&state, &claims).await?;
    let idea = owned_idea(&state, &user, idea_id).await?;

    let context = CoachContext {
        title: idea.title,
        original_text: idea.original_text,
        refined_text: idea.refined_text,
    };
    let reply = assistant.coach(&context, &message, &history).await?;
    Ok(Json(reply))
}

pub async fn buy_premier(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PremierRequest>,
) -> Result<Json<PremierResponse>, ApiError> {
    let days = req.days.unwrap_or(state.premier_days);
    let owner = claims.sub;
    let premier_until =
        with_db(&state, move |db| db.extend_premier(idea_id, owner, days, Utc::now())).await?;
    Ok(Json(PremierResponse {
        idea_id,
        premier_until,
    }))
}

pub async fn set_notes(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NotesRequest>,
) -> Result<StatusCode, ApiError> {
    let notes = optional_field("notes", Some(&req.notes), NOTES_MAX)?.unwrap_or_default();
    let owner = claims.sub;
    with_db(&state, move |db| db.set_research_notes(idea_id, owner, &notes)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn owned_idea(state: &AppState, user: &User, idea_id: Uuid) -> Result<DreamIdea, ApiError> {
    let idea = with_db(state, move |db| db.get_idea(idea_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("idea".into()))?;
    require_owner(user, &idea)?;
    Ok(idea)
}

