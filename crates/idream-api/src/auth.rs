use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use idream_ai::IdeaAssistant;
use idream_db::Database;
use idream_db::models::NewUser;
use idream_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use idream_types::models::{Role, User};

use crate::access::{current_user, require_role, with_db};
use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    /// `None` when no AI key is configured; AI routes then answer 503.
    pub assistant: Option<Arc<dyn IdeaAssistant>>,
    pub premier_days: u32,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    let username = req.username.trim().to_string();
    let name_len = username.chars().count();
    if !(3..=32).contains(&name_len) {
        return Err(ApiError::bad_request("username must be 3 to 32 characters"));
    }
    if req.password.chars().count() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }
    if req.role == Role::Admin {
        return Err(ApiError::forbidden("admin accounts cannot self-register"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(ApiError::internal)?
        .to_string();

    let role = req.role;
    let user = with_db(&state, move |db| {
        db.create_user(&NewUser {
            username: &username,
            password_hash: &password_hash,
            role,
        })
    })
    .await?;

    let token = create_token(&state.jwt_secret, &user)?;
    info!("Registered {} as {}", user.username, user.role);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            role: user.role,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let row = with_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&row.password).map_err(ApiError::internal)?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let token = create_token(&state.jwt_secret, &row.user)?;

    Ok(Json(LoginResponse {
        user_id: row.user.id,
        username: row.user.username,
        role: row.user.role,
        token,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(current_user(&state, &claims).await?))
}

/// Grants the dreamer subscription. Payment is outside this service.
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, ApiError> {
    let user = current_user(&state, &claims).await?;
    require_role(&user, Role::Dreamer)?;

    let user = with_db(&state, move |db| db.set_subscribed(user.id, true)).await?;
    info!("Dreamer {} subscribed", user.username);
    Ok(Json(user))
}

pub(crate) fn create_token(secret: &str, user: &User) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(ApiError::internal)
}

/// Used by tests to mint a token for a user created directly in the store.
#[cfg(test)]
pub(crate) fn token_for(state: &AppState, user_id: uuid::Uuid) -> String {
    let user = state.db.get_user(user_id).unwrap().unwrap();
    create_token(&state.jwt_secret, &user).unwrap()
}
