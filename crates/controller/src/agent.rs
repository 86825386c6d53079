//! Conversation orchestration: the full query pipeline behind one entry
//! point, `ScholarAgent::process_query`.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use scholar_agent_core::{
    AgentResponse, Conversation, ConversationStore, LlmClient, ResponseMetadata, Result,
    ToolClient,
};

use crate::executor::ExecutionEngine;
use crate::intent::{IntentClassifier, IntentContext};
use crate::integrator::{ResponseContext, ResponseIntegrator};
use crate::planner::TaskPlanner;

/// The research assistant.
///
/// One instance serves many concurrent conversations. Per-conversation
/// in-flight flags reject a second query for the same conversation while
/// the first is still running.
pub struct ScholarAgent {
    classifier: IntentClassifier,
    planner: TaskPlanner,
    engine: ExecutionEngine,
    integrator: ResponseIntegrator,
    store: Arc<dyn ConversationStore>,
    /// Fallback cache of conversations the store cannot load anymore.
    conversations: DashMap<String, Conversation>,
    processing: Arc<DashMap<String, ()>>,
}

impl ScholarAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolClient>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(llm.clone()),
            planner: TaskPlanner::new(),
            engine: ExecutionEngine::new(tools, llm.clone()),
            integrator: ResponseIntegrator::new(llm),
            store,
            conversations: DashMap::new(),
            processing: Arc::new(DashMap::new()),
        }
    }

    /// Process one user query end to end.
    ///
    /// Never returns an error: pipeline failures become an apology response
    /// with `error = true`, and a query for a conversation that is already
    /// being processed gets a please-wait notice.
    pub async fn process_query(
        &self,
        query: &str,
        conversation_id: Option<&str>,
        user_id: &str,
    ) -> AgentResponse {
        let started = Instant::now();
        let query_id = Uuid::new_v4().to_string();
        info!(%query_id, ?conversation_id, user_id, "processing query");

        let Some(_guard) = ProcessingGuard::try_acquire(&self.processing, conversation_id) else {
            info!(%query_id, ?conversation_id, "conversation busy, rejecting concurrent query");
            return AgentResponse::text(
                "I'm still working on your previous request. Please wait a moment and try again.",
            );
        };

        match self
            .run_pipeline(query, conversation_id, user_id, &query_id, started)
            .await
        {
            Ok(response) => response,
            Err(pipeline_error) => {
                error!(%query_id, error = %pipeline_error, "query pipeline failed");
                Self::error_response(&pipeline_error.to_string(), &query_id, conversation_id)
            }
        }
    }

    async fn run_pipeline(
        &self,
        query: &str,
        conversation_id: Option<&str>,
        user_id: &str,
        query_id: &str,
        started: Instant,
    ) -> Result<AgentResponse> {
        let conversation = self.load_or_create(conversation_id, user_id).await?;
        self.store
            .append_message(&conversation.id, "user", query, json!({ "query_id": query_id }))
            .await?;

        let context = intent_context(&conversation);
        let analysis = self.classifier.analyze(query, &context).await;

        if analysis.needs_clarification {
            let content = if analysis.clarification_questions.is_empty() {
                "Could you tell me more about what you're looking for?".to_string()
            } else {
                analysis.clarification_questions.join("\n")
            };
            self.store
                .append_message(
                    &conversation.id,
                    "assistant",
                    &content,
                    json!({
                        "query_id": query_id,
                        "intent_type": analysis.primary.intent_type.as_str(),
                        "needs_clarification": true,
                    }),
                )
                .await?;

            let mut response = AgentResponse::text(content);
            response.needs_clarification = true;
            response.metadata = ResponseMetadata {
                intent_type: analysis.primary.intent_type.as_str().to_string(),
                confidence: analysis.primary.confidence,
                ..ResponseMetadata::default()
            };
            response.query_id = Some(query_id.to_string());
            response.conversation_id = Some(conversation.id.clone());
            response.processing_time_ms = Some(started.elapsed().as_millis() as u64);
            return Ok(response);
        }

        let mut plan = self.planner.create_plan(&analysis)?;
        let results = self.engine.execute(&mut plan, query_id).await;

        let response_context = ResponseContext {
            conversation_length: conversation.messages.len() + 1,
            recent_queries: recent_queries(&conversation, query),
        };
        let mut response = self
            .integrator
            .integrate(query, &analysis, &results, &response_context)
            .await;

        let stats = plan.stats();
        self.store
            .append_message(
                &conversation.id,
                "assistant",
                &response.content,
                json!({
                    "query_id": query_id,
                    "intent_type": analysis.primary.intent_type.as_str(),
                    "confidence": analysis.primary.confidence,
                    "task_stats": stats,
                }),
            )
            .await?;

        response.query_id = Some(query_id.to_string());
        response.conversation_id = Some(conversation.id.clone());
        response.task_stats = Some(stats);
        response.processing_time_ms = Some(started.elapsed().as_millis() as u64);
        info!(
            %query_id,
            conversation_id = %conversation.id,
            completed = stats.completed,
            failed = stats.failed,
            elapsed_ms = response.processing_time_ms,
            "query processed"
        );
        Ok(response)
    }

    /// Resolve the conversation: store first, local cache as fallback, new
    /// conversation when the id is unknown or absent.
    async fn load_or_create(
        &self,
        conversation_id: Option<&str>,
        user_id: &str,
    ) -> Result<Conversation> {
        if let Some(id) = conversation_id {
            if let Some(loaded) = self.store.load(id).await? {
                self.conversations.insert(loaded.id.clone(), loaded.clone());
                return Ok(loaded);
            }
            if let Some(cached) = self.conversations.get(id) {
                return Ok(cached.clone());
            }
            warn!(conversation_id = id, "conversation not found, starting a new one");
        }
        let conversation = self.store.create(user_id).await?;
        self.conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(conversation)
    }

    fn error_response(
        message: &str,
        query_id: &str,
        conversation_id: Option<&str>,
    ) -> AgentResponse {
        let mut response = AgentResponse::text(
            "I'm sorry, I ran into a problem while processing your request. Please try again.",
        );
        response.error = true;
        response.metadata.error_message = Some(message.to_string());
        response.query_id = Some(query_id.to_string());
        response.conversation_id = conversation_id.map(str::to_string);
        response
    }
}

/// Classification context from the conversation so far: intent labels of
/// the last five assistant turns.
fn intent_context(conversation: &Conversation) -> IntentContext {
    let recent_intents = conversation
        .messages
        .iter()
        .rev()
        .filter(|m| m.role == "assistant")
        .filter_map(|m| m.metadata_str("intent_type").map(str::to_string))
        .take(5)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    IntentContext {
        recent_intents,
        conversation_length: conversation.messages.len(),
    }
}

/// Recent user queries (truncated) plus the current one, oldest first.
fn recent_queries(conversation: &Conversation, current: &str) -> Vec<String> {
    let mut queries: Vec<String> = conversation
        .messages
        .iter()
        .rev()
        .filter(|m| m.role == "user")
        .take(10)
        .map(|m| m.content.chars().take(50).collect())
        .collect();
    queries.reverse();
    queries.push(current.chars().take(50).collect());
    queries
}

/// Holds a conversation's in-flight flag; releases it on drop, so the flag
/// cannot leak even if the pipeline future is cancelled.
struct ProcessingGuard {
    flags: Arc<DashMap<String, ()>>,
    key: Option<String>,
}

impl ProcessingGuard {
    /// `None` when the conversation already has a query in flight. Queries
    /// without a conversation id are never rejected.
    fn try_acquire(flags: &Arc<DashMap<String, ()>>, conversation_id: Option<&str>) -> Option<Self> {
        let Some(id) = conversation_id else {
            return Some(Self {
                flags: flags.clone(),
                key: None,
            });
        };
        match flags.entry(id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                Some(Self {
                    flags: flags.clone(),
                    key: Some(id.to_string()),
                })
            }
        }
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.flags.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_agent_core::Message;

    #[test]
    fn processing_guard_is_exclusive_per_conversation_and_releases_on_drop() {
        let flags = Arc::new(DashMap::new());

        let first = ProcessingGuard::try_acquire(&flags, Some("c1"));
        assert!(first.is_some());
        assert!(ProcessingGuard::try_acquire(&flags, Some("c1")).is_none());
        assert!(ProcessingGuard::try_acquire(&flags, Some("c2")).is_some());

        drop(first);
        assert!(ProcessingGuard::try_acquire(&flags, Some("c1")).is_some());
    }

    #[test]
    fn queries_without_a_conversation_are_never_rejected() {
        let flags = Arc::new(DashMap::new());
        let a = ProcessingGuard::try_acquire(&flags, None);
        let b = ProcessingGuard::try_acquire(&flags, None);
        assert!(a.is_some() && b.is_some());
    }

    #[test]
    fn intent_context_keeps_last_five_assistant_intents_in_order() {
        let mut conversation = Conversation::new("u1");
        for i in 0..7 {
            conversation.messages.push(Message::new(
                "assistant",
                "reply",
                json!({ "intent_type": format!("intent_{i}") }),
            ));
            conversation
                .messages
                .push(Message::new("user", "question", json!({})));
        }

        let context = intent_context(&conversation);
        assert_eq!(context.conversation_length, 14);
        assert_eq!(
            context.recent_intents,
            vec!["intent_2", "intent_3", "intent_4", "intent_5", "intent_6"]
        );
    }

    #[test]
    fn recent_queries_truncate_and_end_with_the_current_one() {
        let mut conversation = Conversation::new("u1");
        conversation
            .messages
            .push(Message::new("user", "x".repeat(80), json!({})));

        let queries = recent_queries(&conversation, "current question");
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].len(), 50);
        assert_eq!(queries[1], "current question");
    }
}
