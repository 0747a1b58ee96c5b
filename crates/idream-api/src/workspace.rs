use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use idream_db::queries::WorkspaceItem;
use idream_types::api::{
    Claims, CreateContactRequest, CreateGoalRequest, CreateLinkRequest, CreateMeetingRequest,
    UpdateGoalRequest,
};
use idream_types::models::{Contact, Goal};

use crate::access::{optional_field, require_http_url, text_field, with_db};
use crate::auth::AppState;
use crate::error::ApiError;

const SHORT_MAX: usize = 200;
const LONG_MAX: usize = 2_000;

pub async fn add_goal(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGoalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = text_field("text", &req.text, LONG_MAX)?;
    let owner = claims.sub;
    let goal = with_db(&state, move |db| db.add_goal(idea_id, owner, &text)).await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

pub async fn update_goal(
    State(state): State<AppState>,
    Path((idea_id, goal_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateGoalRequest>,
) -> Result<Json<Goal>, ApiError> {
    let owner = claims.sub;
    let goal = with_db(&state, move |db| {
        db.set_goal_completed(idea_id, owner, goal_id, req.completed)
    })
    .await?;
    Ok(Json(goal))
}

pub async fn add_meeting(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateMeetingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = text_field("title", &req.title, SHORT_MAX)?;
    let notes = optional_field("notes", req.notes.as_deref(), LONG_MAX)?;
    let owner = claims.sub;
    let meeting = with_db(&state, move |db| {
        db.add_meeting(idea_id, owner, &title, req.date, notes.as_deref())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

pub async fn add_link(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = text_field("title", &req.title, SHORT_MAX)?;
    let url = text_field("url", &req.url, LONG_MAX)?;
    require_http_url("url", &url)?;
    let description = optional_field("description", req.description.as_deref(), LONG_MAX)?;
    let owner = claims.sub;
    let link = with_db(&state, move |db| {
        db.add_research_link(idea_id, owner, &title, &url, description.as_deref())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn add_contact(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = Contact {
        id: Uuid::new_v4(),
        name: text_field("name", &req.name, SHORT_MAX)?,
        phone: optional_field("phone", req.phone.as_deref(), SHORT_MAX)?,
        email: optional_field("email", req.email.as_deref(), SHORT_MAX)?,
        notes: optional_field("notes", req.notes.as_deref(), LONG_MAX)?,
    };
    let owner = claims.sub;
    let contact = with_db(&state, move |db| db.add_contact(idea_id, owner, contact)).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

async fn delete_item(
    state: &AppState,
    claims: &Claims,
    idea_id: Uuid,
    item: WorkspaceItem,
    item_id: Uuid,
) -> Result<StatusCode, ApiError> {
    let owner = claims.sub;
    with_db(state, move |db| db.delete_workspace_item(idea_id, owner, item, item_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_goal(
    State(state): State<AppState>,
    Path((idea_id, item_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    delete_item(&state, &claims, idea_id, WorkspaceItem::Goal, item_id).await
}

pub async fn delete_meeting(
    State(state): State<AppState>,
    Path((idea_id, item_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    delete_item(&state, &claims, idea_id, WorkspaceItem::Meeting, item_id).await
}

pub async fn delete_link(
    State(state): State<AppState>,
    Path((idea_id, item_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    delete_item(&state, &claims, idea_id, WorkspaceItem::Link, item_id).await
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Path((idea_id, item_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    delete_item(&state, &claims, idea_id, WorkspaceItem::Contact, item_id).await
}
