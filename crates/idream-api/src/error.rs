use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use idream_ai::AiError;
use idream_db::StoreError;
use idream_types::lifecycle::LifecycleError;

/// Every handler error. Rendered as `{ "error": "<message>" }` with the
/// matching status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("{0}")]
    PaymentRequired(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("AI assistant is not configured")]
    AiUnavailable,
    #[error("AI request failed: {0}")]
    Ai(#[from] AiError),
    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl std::fmt::Display) -> Self {
        Self::Internal(msg.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::AiUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Ai(AiError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            Self::Ai(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::SubscriptionRequired => Self::PaymentRequired(e.to_string()),
            LifecycleError::NonPositiveAmount
            | LifecycleError::BelowMinimumInvestment
            | LifecycleError::InvalidPremierDays(_) => Self::BadRequest(e.to_string()),
            LifecycleError::NotPrivate(_)
            | LifecycleError::NotOpenForOffers(_)
            | LifecycleError::OfferNotPending(_)
            | LifecycleError::AlreadyAccepted
            | LifecycleError::PremierUnavailable(_) => Self::Conflict(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::NotFound(what.to_string()),
            StoreError::Forbidden(why) => Self::Forbidden(why.to_string()),
            StoreError::Conflict(why) => Self::Conflict(why),
            StoreError::Lifecycle(e) => e.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Internal(detail) => error!("Internal error: {}", detail),
            Self::Ai(e) => error!("AI error: {}", e),
            _ => {}
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
