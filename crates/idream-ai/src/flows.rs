use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use idream_types::api::{ChatRole, ChatTurn, CoachResponse, RefineResponse};

use crate::IdeaAssistant;
use crate::client::{Content, GeminiClient, GenerateRequest, GenerationConfig};
use crate::error::AiError;

const COACH_TEMPERATURE: f32 = 0.6;

/// The idea a coaching conversation is about.
#[derive(Debug, Clone)]
pub struct CoachContext {
    pub title: String,
    pub original_text: String,
    pub refined_text: Option<String>,
}

pub fn refinement_prompt(idea: &str) -> String {
    format!(
        "You are an AI assistant designed to help users refine their ideas. \
         Provide a refined version of the idea, along with a few specific suggestions for improvement.\n\n\
         Original Idea: {}\n\n\
         Refined Idea and Suggestions:",
        idea
    )
}

pub fn coach_system_prompt(ctx: &CoachContext) -> String {
    let mut prompt = String::from(
        "You are an AI Dream Coach, an expert startup advisor and mentor. Your goal is to help users \
         develop and refine their ideas. Be encouraging, insightful, and practical.\n\n\
         Always use the provided context about the user's idea and the ongoing conversation to give \
         relevant and actionable advice.\n\n\
         Current Idea Context:\n",
    );
    prompt.push_str(&format!("Title: {}\n", ctx.title));
    prompt.push_str(&format!("Original Idea: {}\n", ctx.original_text));
    if let Some(refined) = ctx.refined_text.as_deref().filter(|r| !r.trim().is_empty()) {
        prompt.push_str(&format!("Refined Idea: {}\n", refined));
    }
    prompt.push_str(
        "\nFocus on the user's current message within the conversation history. Ask clarifying \
         questions if needed. Keep your responses concise but helpful.\n\
         If the chat history is empty, and the user's message is a simple greeting, introduce \
         yourself and offer to help with their idea.",
    );
    prompt
}

pub fn refinement_request(idea: &str) -> GenerateRequest {
    GenerateRequest {
        system_instruction: None,
        contents: vec![Content::text(Some("user"), refinement_prompt(idea))],
        generation_config: GenerationConfig::json(
            json!({
                "type": "OBJECT",
                "properties": {
                    "refined_idea": {
                        "type": "STRING",
                        "description": "The refined idea with suggestions for improvement."
                    },
                    "suggestions": {
                        "type": "ARRAY",
                        "items": {"type": "STRING"},
                        "description": "Specific suggestions for improving the idea."
                    }
                },
                "required": ["refined_idea", "suggestions"]
            }),
            None,
        ),
    }
}

/// History turns first, then the current message as the final user turn.
pub fn coach_request(ctx: &CoachContext, message: &str, history: &[ChatTurn]) -> GenerateRequest {
    let mut contents: Vec<Content> = history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                ChatRole::User => "user",
                ChatRole::Model => "model",
            };
            Content::text(Some(role), turn.content.clone())
        })
        .collect();
    contents.push(Content::text(Some("user"), message));

    GenerateRequest {
        system_instruction: Some(Content::text(None, coach_system_prompt(ctx))),
        contents,
        generation_config: GenerationConfig::json(
            json!({
                "type": "OBJECT",
                "properties": {
                    "coach_response": {
                        "type": "STRING",
                        "description": "The AI coach's response to the user."
                    }
                },
                "required": ["coach_response"]
            }),
            Some(COACH_TEMPERATURE),
        ),
    }
}

#[async_trait]
impl IdeaAssistant for GeminiClient {
    async fn refine_idea(&self, idea: &str) -> Result<RefineResponse, AiError> {
        debug!("Refining idea ({} chars) with {}", idea.len(), self.model());
        self.generate_json(&refinement_request(idea)).await
    }

    async fn coach(
        &self,
        context: &CoachContext,
        message: &str,
        history: &[ChatTurn],
    ) -> Result<CoachResponse, AiError> {
        debug!(
            "Coaching on '{}' with {} prior turns",
            context.title,
            history.len()
        );
        self.generate_json(&coach_request(context, message, history))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::parse_output;

    fn ctx(refined: Option<&str>) -> CoachContext {
        CoachContext {
            title: "Solar kiosks".into(),
            original_text: "Charging kiosks for rural markets".into(),
            refined_text: refined.map(str::to_string),
        }
    }

    #[test]
    fn refinement_prompt_embeds_idea() {
        let req = refinement_request("A bike-sharing app for campuses");
        let text = &req.contents[0].parts[0].text;
        assert!(text.contains("Original Idea: A bike-sharing app for campuses"));
        assert!(req.system_instruction.is_none());
    }

    #[test]
    fn coach_prompt_includes_refined_text_only_when_present() {
        assert!(!coach_system_prompt(&ctx(None)).contains("Refined Idea:"));
        assert!(!coach_system_prompt(&ctx(Some("  "))).contains("Refined Idea:"));
        let prompt = coach_system_prompt(&ctx(Some("Modular kiosks")));
        assert!(prompt.contains("Title: Solar kiosks"));
        assert!(prompt.contains("Refined Idea: Modular kiosks"));
    }

    #[test]
    fn coach_request_appends_message_after_history() {
        let history = vec![
            ChatTurn {
                role: ChatRole::User,
                content: "hi".into(),
            },
            ChatTurn {
                role: ChatRole::Model,
                content: "hello!".into(),
            },
        ];
        let req = coach_request(&ctx(None), "How do I price it?", &history);

        let roles: Vec<&str> = req
            .contents
            .iter()
            .map(|c| c.role.as_deref().unwrap())
            .collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(req.contents[2].parts[0].text, "How do I price it?");
        assert_eq!(req.generation_config.temperature, Some(COACH_TEMPERATURE));
    }

    #[test]
    fn outputs_parse_into_api_types() {
        let refined: RefineResponse = parse_output(
            r#"{"refined_idea": "Modular kiosks", "suggestions": ["Pilot in one town"]}"#,
        )
        .unwrap();
        assert_eq!(refined.suggestions, vec!["Pilot in one town".to_string()]);

        let coach: CoachResponse =
            parse_output("```json\n{\"coach_response\": \"Start small.\"}\n```").unwrap();
        assert_eq!(coach.coach_response, "Start small.");
    }
}
