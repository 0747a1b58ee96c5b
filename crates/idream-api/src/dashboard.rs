use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use idream_types::api::{AdminDashboard, Claims, DreamerDashboard, FeedQuery, InvestorFeed};
use idream_types::models::{Role, User};

use crate::access::{
    current_user, optional_field, require_approved_investor, require_role, with_db,
};
use crate::auth::AppState;
use crate::error::ApiError;

const RECENT_MESSAGES: u32 = 3;
const SEARCH_MAX: usize = 200;

/// Open ideas, active premier boosts first. `q` filters both lists by
/// title or idea text; `sort` orders the regular list by last update.
pub async fn investor_feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<InvestorFeed>, ApiError> {
    let user = current_user(&state, &claims).await?;
    require_approved_investor(&user)?;

    let search = optional_field("q", query.q.as_deref(), SEARCH_MAX)?;
    let now = Utc::now();
    let feed = with_db(&state, move |db| {
        Ok(InvestorFeed {
            premier: db.active_premier_ideas(now, search.as_deref())?,
            ideas: db.regular_open_ideas(now, search.as_deref(), query.sort)?,
        })
    })
    .await?;
    Ok(Json(feed))
}

pub async fn dreamer_dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DreamerDashboard>, ApiError> {
    let user = current_user(&state, &claims).await?;
    require_role(&user, Role::Dreamer)?;

    let dashboard = with_db(&state, move |db| {
        Ok(DreamerDashboard {
            counts: db.status_counts(Some(user.id))?,
            funded: db.closed_ideas_for_owner(user.id)?,
            pending_offers: db.pending_offers_for_owner(user.id)?,
            recent_messages: db.recent_messages_for_owner(user.id, RECENT_MESSAGES)?,
        })
    })
    .await?;
    Ok(Json(dashboard))
}

pub async fn admin_dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AdminDashboard>, ApiError> {
    let user = current_user(&state, &claims).await?;
    require_role(&user, Role::Admin)?;

    let dashboard = with_db(&state, |db| {
        let roles = db.role_counts()?;
        Ok(AdminDashboard {
            ideas: db.status_counts(None)?,
            dreamers: roles.dreamers,
            investors: roles.investors,
            admins: roles.admins,
            pending_investors: db.pending_investors()?,
        })
    })
    .await?;
    Ok(Json(dashboard))
}

pub async fn approve_investor(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, ApiError> {
    let admin = current_user(&state, &claims).await?;
    require_role(&admin, Role::Admin)?;

    let investor = with_db(&state, move |db| db.approve_investor(user_id)).await?;
    info!("Investor {} approved by {}", investor.username, admin.username);
    Ok(Json(investor))
}
