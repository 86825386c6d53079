//! Mock implementations of the collaborator traits for testing.
//!
//! These are used across the workspace for unit and integration testing of
//! the pipeline without a real LLM, tool service, or database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::traits::{ChatMessage, ConversationStore, GenerateOptions, LlmClient, ToolClient};
use crate::types::{Conversation, Message};

// =============================================================================
// Mock LLM Client
// =============================================================================

/// Scripted mock LLM.
///
/// `classify_intent` pops from a queue of JSON values; `generate` pops from
/// a queue of strings. An exhausted queue repeats its last entry. A failing
/// mock errors on every call, which exercises the fallback paths.
pub struct MockLlm {
    classify_responses: Mutex<Vec<Value>>,
    generate_responses: Mutex<Vec<String>>,
    fail_all: bool,
    classify_calls: Mutex<usize>,
    generate_calls: Mutex<usize>,
}

impl MockLlm {
    pub fn new(classify_responses: Vec<Value>, generate_responses: Vec<String>) -> Self {
        Self {
            classify_responses: Mutex::new(classify_responses),
            generate_responses: Mutex::new(generate_responses),
            fail_all: false,
            classify_calls: Mutex::new(0),
            generate_calls: Mutex::new(0),
        }
    }

    /// Mock that returns the same generation text forever and has no
    /// scripted classifications.
    pub fn constant(text: &str) -> Self {
        Self::new(Vec::new(), vec![text.to_string()])
    }

    /// Mock that fails every call.
    pub fn failing() -> Self {
        Self {
            classify_responses: Mutex::new(Vec::new()),
            generate_responses: Mutex::new(Vec::new()),
            fail_all: true,
            classify_calls: Mutex::new(0),
            generate_calls: Mutex::new(0),
        }
    }

    pub fn classify_calls(&self) -> usize {
        *self.classify_calls.lock().unwrap()
    }

    pub fn generate_calls(&self) -> usize {
        *self.generate_calls.lock().unwrap()
    }

    fn next<T: Clone>(queue: &Mutex<Vec<T>>, calls: &Mutex<usize>) -> Option<T> {
        let mut count = calls.lock().unwrap();
        *count += 1;
        let queue = queue.lock().unwrap();
        if queue.is_empty() {
            return None;
        }
        let idx = (*count - 1).min(queue.len() - 1);
        Some(queue[idx].clone())
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn generate(
        &self,
        _messages: &[ChatMessage],
        _options: &GenerateOptions,
    ) -> Result<String> {
        if self.fail_all {
            return Err(Error::llm_provider("mock llm configured to fail"));
        }
        Self::next(&self.generate_responses, &self.generate_calls)
            .ok_or_else(|| Error::llm_provider("mock llm has no generate responses"))
    }

    async fn classify_intent(&self, _prompt: &str) -> Result<Value> {
        if self.fail_all {
            return Err(Error::llm_provider("mock llm configured to fail"));
        }
        Self::next(&self.classify_responses, &self.classify_calls)
            .ok_or_else(|| Error::llm_provider("mock llm has no classify responses"))
    }
}

// =============================================================================
// Recording Tool Client
// =============================================================================

/// Tool client with canned per-tool responses that records every call.
#[derive(Default)]
pub struct RecordingToolClient {
    responses: Mutex<HashMap<String, Value>>,
    failures: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl RecordingToolClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canned response for a tool.
    pub fn with_response(self, tool_name: &str, response: Value) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(tool_name.to_string(), response);
        self
    }

    /// Make a tool fail with the given message.
    pub fn with_failure(self, tool_name: &str, message: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(tool_name.to_string(), message.to_string());
        self
    }

    /// All `(tool_name, arguments)` pairs seen so far, in call order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    /// Arguments of the calls made to one tool.
    pub fn calls_for(&self, tool_name: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == tool_name)
            .map(|(_, args)| args.clone())
            .collect()
    }
}

#[async_trait]
impl ToolClient for RecordingToolClient {
    async fn call(&self, tool_name: &str, arguments: &Value) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((tool_name.to_string(), arguments.clone()));

        if let Some(message) = self.failures.lock().unwrap().get(tool_name) {
            return Err(Error::tool_call(message.clone()));
        }
        let responses = self.responses.lock().unwrap();
        responses
            .get(tool_name)
            .cloned()
            .ok_or_else(|| Error::ToolNotFound(tool_name.to_string()))
    }
}

// =============================================================================
// Mock Conversation Store
// =============================================================================

/// In-memory conversation store.
#[derive(Default)]
pub struct MockConversationStore {
    conversations: Mutex<HashMap<String, Conversation>>,
}

impl MockConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.conversations.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages of a conversation, for assertions.
    pub fn messages(&self, conversation_id: &str) -> Vec<Message> {
        self.conversations
            .lock()
            .unwrap()
            .get(conversation_id)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConversationStore for MockConversationStore {
    async fn create(&self, user_id: &str) -> Result<Conversation> {
        let conversation = Conversation::new(user_id);
        self.conversations
            .lock()
            .unwrap()
            .insert(conversation.id.clone(), conversation.clone());
        Ok(conversation)
    }

    async fn load(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        Ok(self
            .conversations
            .lock()
            .unwrap()
            .get(conversation_id)
            .cloned())
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
        metadata: Value,
    ) -> Result<()> {
        let mut conversations = self.conversations.lock().unwrap();
        let conversation = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| Error::ConversationNotFound(conversation_id.to_string()))?;
        conversation
            .messages
            .push(Message::new(role, content, metadata));
        conversation.updated_at = chrono::Utc::now();
        Ok(())
    }
}
