//! Generative-AI helpers for dreamers: one-shot idea refinement and a
//! conversational "dream coach".

pub mod client;
pub mod error;
pub mod flows;

use async_trait::async_trait;

use idream_types::api::{ChatTurn, CoachResponse, RefineResponse};

pub use client::GeminiClient;
pub use error::AiError;
pub use flows::CoachContext;

/// The two AI flows the API exposes. Implemented by [`GeminiClient`]; tests
/// plug in canned implementations.
#[async_trait]
pub trait IdeaAssistant: Send + Sync {
    async fn refine_idea(&self, idea: &str) -> Result<RefineResponse, AiError>;

    async fn coach(
        &self,
        context: &CoachContext,
        message: &str,
        history: &[ChatTurn],
    ) -> Result<CoachResponse, AiError>;
}
