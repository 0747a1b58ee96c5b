use std::sync::Arc;

use tracing::error;

use idream_db::Database;
use idream_types::api::Claims;
use idream_types::models::{DreamIdea, Role, User};

use crate::auth::AppState;
use crate::error::ApiError;

/// Run blocking DB work off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> idream_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db: Arc<Database> = state.db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal(e)
        })?
        .map_err(ApiError::from)
}

/// The caller's current user row. Flags such as `subscribed` and `approved`
/// are read here rather than trusted from the token.
pub async fn current_user(state: &AppState, claims: &Claims) -> Result<User, ApiError> {
    let id = claims.sub;
    with_db(state, move |db| db.get_user(id))
        .await?
        .ok_or(ApiError::Unauthorized)
}

pub fn require_role(user: &User, role: Role) -> Result<(), ApiError> {
    if user.role == role {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!("{} access required", role)))
    }
}

pub fn require_approved_investor(user: &User) -> Result<(), ApiError> {
    require_role(user, Role::Investor)?;
    if !user.approved {
        return Err(ApiError::forbidden("investor account awaiting approval"));
    }
    Ok(())
}

/// Loads an idea and shapes it for the caller: full for the owner and
/// admins, redacted for approved investors once it has been submitted.
pub async fn visible_idea(
    state: &AppState,
    user: &User,
    idea_id: uuid::Uuid,
) -> Result<DreamIdea, ApiError> {
    let idea = with_db(state, move |db| db.get_idea(idea_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("idea".into()))?;

    if idea.owner_id == user.id || user.role == Role::Admin {
        return Ok(idea);
    }
    if user.is_approved_investor() && idea.status.is_visible_to_investors() {
        return Ok(idea.redact_for_investor(user.id));
    }
    // Private ideas are indistinguishable from missing ones to outsiders.
    Err(ApiError::NotFound("idea".into()))
}

pub fn require_owner(user: &User, idea: &DreamIdea) -> Result<(), ApiError> {
    if idea.owner_id == user.id {
        Ok(())
    } else {
        Err(ApiError::forbidden("not the owner of this idea"))
    }
}

/// Trimmed, non-empty text no longer than `max` characters.
pub fn text_field(field: &str, value: &str, max: usize) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{} must not be empty", field)));
    }
    if value.chars().count() > max {
        return Err(ApiError::bad_request(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

/// Optional text: blank becomes `None`.
pub fn optional_field(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => text_field(field, v, max).map(Some),
        None => Ok(None),
    }
}

/// Rejects anything that is not an absolute http(s) URL.
pub fn require_http_url(field: &str, url: &str) -> Result<(), ApiError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "{} must start with http:// or https://",
            field
        )))
    }
}
