use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    FeedSort, IdeaSummary, InvestmentOffer, Message, OfferKind, Role, StatusCounts, User,
};

// -- JWT Claims --

/// JWT claims issued at login. Role is informational; permission checks read
/// the current user row so approvals and subscriptions take effect at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub role: Role,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub token: String,
}

// -- Profile --

/// `PUT /me/profile` replaces the whole profile.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub description: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub image_url: Option<String>,
}

// -- Ideas --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateIdeaRequest {
    pub title: String,
    pub original_text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateIdeaRequest {
    pub title: Option<String>,
    pub original_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotesRequest {
    pub notes: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PremierRequest {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PremierResponse {
    pub idea_id: Uuid,
    pub premier_until: DateTime<Utc>,
}

// -- Workspace --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGoalRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateGoalRequest {
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMeetingRequest {
    pub title: String,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateLinkRequest {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateContactRequest {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

// -- AI --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefineRequest {
    pub idea: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineResponse {
    pub refined_idea: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoachRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachResponse {
    pub coach_response: String,
}

// -- Offers --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOfferRequest {
    pub kind: OfferKind,
    pub amount: i64,
    pub message: Option<String>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

// -- Dashboards --

/// `GET /investor/feed?q=..&sort=newest|oldest`
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub q: Option<String>,
    #[serde(default)]
    pub sort: FeedSort,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvestorFeed {
    pub premier: Vec<IdeaSummary>,
    pub ideas: Vec<IdeaSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOffer {
    pub idea_title: String,
    #[serde(flatten)]
    pub offer: InvestmentOffer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentMessage {
    pub idea_title: String,
    #[serde(flatten)]
    pub message: Message,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DreamerDashboard {
    pub counts: StatusCounts,
    pub funded: Vec<IdeaSummary>,
    pub pending_offers: Vec<PendingOffer>,
    pub recent_messages: Vec<RecentMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminDashboard {
    pub ideas: StatusCounts,
    pub dreamers: i64,
    pub investors: i64,
    pub admins: i64,
    pub pending_investors: Vec<User>,
}
