//! Client for the external language assistant, the last-resort extraction
//! tier. One implementation speaks the OpenAI chat-completions wire format;
//! the trait seam exists so tests can drop in a canned assistant.

mod open_ai;
mod prompt;

pub use open_ai::OpenAiAssistant;
pub use prompt::RECIPE_SCHEMA_PROMPT;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Assistant request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Assistant response was malformed: {0}")]
    MalformedResponse(String),

    #[error("Assistant is not configured: {0}")]
    NotConfigured(String),
}

/// A hosted text-completion service. Input is bounded by the caller; output
/// is untrusted and validated downstream.
#[async_trait]
pub trait LanguageAssistant: Send + Sync {
    fn name(&self) -> &str;

    /// One completion round-trip: system instructions plus bounded user
    /// text in, raw assistant text out.
    async fn complete(&self, system: &str, user: &str) -> Result<String, AssistantError>;
}
