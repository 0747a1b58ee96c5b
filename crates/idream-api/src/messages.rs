use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use idream_types::api::{Claims, SendMessageRequest};
use idream_types::models::Message;

use crate::access::{text_field, with_db};
use crate::auth::AppState;
use crate::error::ApiError;

pub const MESSAGE_MAX: usize = 4_000;

pub async fn send_message(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = text_field("content", &req.content, MESSAGE_MAX)?;
    let sender = claims.sub;
    let message = with_db(&state, move |db| db.append_message(idea_id, sender, &content)).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Returns the thread in sequence order and marks the other side's messages read.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let reader = claims.sub;
    let thread = with_db(&state, move |db| db.read_thread(idea_id, reader)).await?;
    Ok(Json(thread))
}
