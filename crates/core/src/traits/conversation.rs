//! Conversation store collaborator interface.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::Conversation;

/// Persistence seam for conversations and messages. The pipeline is
/// agnostic to the backing storage.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create a new conversation for a user.
    async fn create(&self, user_id: &str) -> Result<Conversation>;

    /// Load a conversation with its messages.
    async fn load(&self, conversation_id: &str) -> Result<Option<Conversation>>;

    /// Append a message to a conversation.
    async fn append_message(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
        metadata: Value,
    ) -> Result<()>;
}
