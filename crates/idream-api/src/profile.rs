use axum::{Extension, Json, extract::State};
use tracing::info;

use idream_types::api::{Claims, UpdateProfileRequest};
use idream_types::models::{Profile, Role, normalize_skills};

use crate::access::{
    current_user, optional_field, require_http_url, require_role, text_field, with_db,
};
use crate::auth::AppState;
use crate::error::ApiError;

const DESCRIPTION_MAX: usize = 2_000;
const IMAGE_URL_MAX: usize = 2_000;
const SKILL_MAX: usize = 50;
const SKILLS_MAX: usize = 30;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Profile>, ApiError> {
    let user = current_user(&state, &claims).await?;
    require_role(&user, Role::Dreamer)?;

    let profile = with_db(&state, move |db| db.get_profile(user.id)).await?;
    Ok(Json(profile))
}

/// Replaces the caller's profile. Skills are trimmed and de-duplicated
/// before the limits apply.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let user = current_user(&state, &claims).await?;
    require_role(&user, Role::Dreamer)?;

    let description =
        optional_field("description", req.description.as_deref(), DESCRIPTION_MAX)?;
    let image_url = optional_field("image_url", req.image_url.as_deref(), IMAGE_URL_MAX)?;
    if let Some(url) = &image_url {
        require_http_url("image_url", url)?;
    }
    let skills = normalize_skills(&req.skills);
    if skills.len() > SKILLS_MAX {
        return Err(ApiError::bad_request(format!(
            "at most {} skills are allowed",
            SKILLS_MAX
        )));
    }
    for skill in &skills {
        text_field("skill", skill, SKILL_MAX)?;
    }

    let profile = with_db(&state, move |db| {
        db.upsert_profile(user.id, description.as_deref(), &skills, image_url.as_deref())
    })
    .await?;
    info!("Profile updated by {}", claims.username);
    Ok(Json(profile))
}
