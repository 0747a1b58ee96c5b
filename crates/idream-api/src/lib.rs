pub mod access;
pub mod ai;
pub mod auth;
pub mod dashboard;
pub mod error;
pub mod ideas;
pub mod messages;
pub mod middleware;
pub mod offers;
pub mod profile;
pub mod workspace;


use axum::{
    Json, Router,
    routing::{delete, get, patch, post, put},
};
use serde_json::{Value, json};

use crate::auth::AppState;
use crate::middleware::require_auth;

/// All HTTP routes. Cross-cutting layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/me/subscription", post(auth::subscribe))
        .route(
            "/me/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/ai/refine", post(ai::refine))
        .route("/ideas", get(ideas::list_ideas).post(ideas::create_idea))
        .route("/ideas/{id}", get(ideas::get_idea).patch(ideas::update_idea))
        .route("/ideas/{id}/submit", post(ideas::submit_idea))
        .route("/ideas/{id}/refine", post(ideas::refine_idea))
        .route("/ideas/{id}/coach", post(ideas::coach))
        .route("/ideas/{id}/premier", post(ideas::buy_premier))
        .route("/ideas/{id}/notes", put(ideas::set_notes))
        .route("/ideas/{id}/goals", post(workspace::add_goal))
        .route(
            "/ideas/{id}/goals/{goal_id}",
            patch(workspace::update_goal).delete(workspace::delete_goal),
        )
        .route("/ideas/{id}/meetings", post(workspace::add_meeting))
        .route(
            "/ideas/{id}/meetings/{meeting_id}",
            delete(workspace::delete_meeting),
        )
        .route("/ideas/{id}/links", post(workspace::add_link))
        .route(
            "/ideas/{id}/links/{link_id}",
            delete(workspace::delete_link),
        )
        .route("/ideas/{id}/contacts", post(workspace::add_contact))
        .route(
            "/ideas/{id}/contacts/{contact_id}",
            delete(workspace::delete_contact),
        )
        .route(
            "/ideas/{id}/offers",
            get(offers::list_offers).post(offers::create_offer),
        )
        .route(
            "/ideas/{id}/offers/{offer_id}/accept",
            post(offers::accept_offer),
        )
        .route(
            "/ideas/{id}/offers/{offer_id}/reject",
            post(offers::reject_offer),
        )
        .route(
            "/ideas/{id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route("/investor/feed", get(dashboard::investor_feed))
        .route("/dashboard", get(dashboard::dreamer_dashboard))
        .route("/admin/dashboard", get(dashboard::admin_dashboard))
        .route(
            "/admin/investors/{id}/approve",
            post(dashboard::approve_investor),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
