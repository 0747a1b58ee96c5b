use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use idream_types::api::{Claims, CreateOfferRequest};
use idream_types::lifecycle::Decision;
use idream_types::models::InvestmentOffer;

use crate::access::{current_user, optional_field, visible_idea, with_db};
use crate::auth::AppState;
use crate::error::ApiError;

const OFFER_MESSAGE_MAX: usize = 2_000;

/// The owner sees every offer on the idea; an investor only their own.
pub async fn list_offers(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<InvestmentOffer>>, ApiError> {
    let user = current_user(&state, &claims).await?;
    let idea = visible_idea(&state, &user, idea_id).await?;
    if idea.owner_id != user.id && !user.is_approved_investor() {
        return Err(ApiError::forbidden("not allowed to view offers on this idea"));
    }
    // visible_idea already filtered an investor's view down to their own offers.
    Ok(Json(idea.offers))
}

pub async fn create_offer(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateOfferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = optional_field("message", req.message.as_deref(), OFFER_MESSAGE_MAX)?;
    let investor = claims.sub;
    let offer = with_db(&state, move |db| {
        db.create_offer(idea_id, investor, req.kind, req.amount, message.as_deref())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

pub async fn accept_offer(
    State(state): State<AppState>,
    Path((idea_id, offer_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    decide(&state, &claims, idea_id, offer_id, Decision::Accept).await
}

pub async fn reject_offer(
    State(state): State<AppState>,
    Path((idea_id, offer_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    decide(&state, &claims, idea_id, offer_id, Decision::Reject).await
}

async fn decide(
    state: &AppState,
    claims: &Claims,
    idea_id: Uuid,
    offer_id: Uuid,
    decision: Decision,
) -> Result<Json<Value>, ApiError> {
    let owner = claims.sub;
    let decided =
        with_db(state, move |db| db.decide_offer(idea_id, offer_id, owner, decision)).await?;

    if decided.auto_rejected > 0 {
        info!(
            "Accepting offer {} closed {} other pending offers",
            offer_id, decided.auto_rejected
        );
    }
    Ok(Json(json!({
        "offer": decided.offer,
        "idea_status": decided.idea_status,
        "auto_rejected": decided.auto_rejected,
    })))
}
