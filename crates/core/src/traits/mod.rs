//! Collaborator traits consumed by the pipeline.

pub mod conversation;
pub mod llm;
pub mod tools;

pub use conversation::ConversationStore;
pub use llm::{ChatMessage, GenerateOptions, LlmClient};
pub use tools::ToolClient;
