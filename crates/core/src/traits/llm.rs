//! LLM collaborator interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Chat message for LLM interactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role (system, user, assistant).
    pub role: String,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Generation options passed with every LLM call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

/// LLM client interface.
///
/// Implementations signal failure via `Err`; callers in the core always
/// wrap calls with fallback logic.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a chat completion.
    async fn generate(&self, messages: &[ChatMessage], options: &GenerateOptions)
        -> Result<String>;

    /// Classify a query's intent. May return a structured object
    /// (`{intent_type, confidence, parameters}`) or free text under an
    /// `analysis` key; the classifier tolerates both.
    async fn classify_intent(&self, prompt: &str) -> Result<Value>;
}
