//! Response integration: task results in, one `AgentResponse` out.
//!
//! Infallible by contract. The LLM rendering step has a template fallback,
//! and everything else is pure data shaping, so a user always gets a
//! well-formed response even when every upstream component failed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use scholar_agent_core::{
    AgentResponse, ChatMessage, GenerateOptions, IntentAnalysis, IntentType, LlmClient,
    ResponseMetadata,
};

use crate::prompts;
use crate::strategies::{self, StrategySummary};

/// Conversation context available to response generation.
#[derive(Debug, Clone, Default)]
pub struct ResponseContext {
    pub conversation_length: usize,
    /// Truncated recent user queries, most recent last.
    pub recent_queries: Vec<String>,
}

/// Integrates execution results into the final agent response.
pub struct ResponseIntegrator {
    llm: Arc<dyn LlmClient>,
}

impl ResponseIntegrator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Build the final response for one query.
    pub async fn integrate(
        &self,
        query: &str,
        analysis: &IntentAnalysis,
        execution_results: &HashMap<String, Value>,
        context: &ResponseContext,
    ) -> AgentResponse {
        let filtered = filter_results(execution_results);
        let strategy = strategies::select_strategy(analysis.primary.intent_type);
        let summary = strategies::build_summary(strategy, &filtered);
        debug!(
            strategy,
            sources = filtered.len(),
            dropped = execution_results.len() - filtered.len(),
            "integrating results"
        );

        let content = self
            .render_content(query, strategy, &summary, analysis, context)
            .await;

        AgentResponse {
            content,
            metadata: ResponseMetadata {
                intent_type: analysis.primary.intent_type.as_str().to_string(),
                confidence: analysis.primary.confidence,
                strategy: Some(strategy.to_string()),
                data_sources: filtered.keys().cloned().collect(),
                error_message: None,
            },
            structured_data: summary.summary,
            insights: summary.insights,
            recommendations: summary.recommendations,
            follow_up_suggestions: follow_up_suggestions(analysis.primary.intent_type),
            ..AgentResponse::default()
        }
    }

    /// Render natural-language content via the LLM, falling back to a
    /// deterministic template when the LLM fails or returns nothing.
    async fn render_content(
        &self,
        query: &str,
        strategy: &str,
        summary: &StrategySummary,
        analysis: &IntentAnalysis,
        context: &ResponseContext,
    ) -> String {
        let research_data = json!({
            "strategy": strategy,
            "intent_type": analysis.primary.intent_type.as_str(),
            "confidence": analysis.primary.confidence,
            "summary": summary.summary,
            "insights": summary.insights,
            "recommendations": summary.recommendations,
            "conversation_length": context.conversation_length,
        });
        let messages = [
            ChatMessage::system(prompts::response_generation_prompt(strategy)),
            ChatMessage::user(format!(
                "User query: {query}\n\nResearch data: {research_data}\n\nPlease generate a natural response:"
            )),
        ];

        match self.llm.generate(&messages, &GenerateOptions::default()).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(strategy, "LLM returned empty response content, using template");
                fallback_content(summary)
            }
            Err(error) => {
                warn!(strategy, %error, "response generation failed, using template");
                fallback_content(summary)
            }
        }
    }
}

/// Drop failed task results and unwrap text envelopes.
///
/// A `{content, type: "text"}` envelope whose text parses as JSON is
/// replaced by the parsed value, so strategies see the tool's real payload.
/// Returns a `BTreeMap` to keep `data_sources` deterministic.
fn filter_results(execution_results: &HashMap<String, Value>) -> BTreeMap<String, Value> {
    execution_results
        .iter()
        .filter(|(_, value)| value.get("error").is_none())
        .map(|(id, value)| (id.clone(), unwrap_envelope(value)))
        .collect()
}

fn unwrap_envelope(value: &Value) -> Value {
    let is_text = value.get("type").and_then(Value::as_str) == Some("text");
    if !is_text {
        return value.clone();
    }
    match value.get("content").and_then(Value::as_str) {
        Some(text) => serde_json::from_str(text).unwrap_or_else(|_| json!({ "text": text })),
        None => value.clone(),
    }
}

/// Deterministic content template for when the LLM is unavailable.
fn fallback_content(summary: &StrategySummary) -> String {
    let mut content = String::from("Based on your query, I found the following information:\n");
    content.push_str(&format!("\nData overview: {}\n", summary.summary));
    if !summary.insights.is_empty() {
        content.push_str("\nKey findings:\n");
        for insight in summary.insights.iter().take(3) {
            content.push_str(&format!("- {insight}\n"));
        }
    }
    content
}

/// Canned follow-up suggestions per intent.
fn follow_up_suggestions(intent_type: IntentType) -> Vec<String> {
    let suggestions: &[&str] = match intent_type {
        IntentType::SearchPapers => &[
            "Show me details for the top result",
            "Who are the most cited authors in this area?",
            "What are the trending papers on this topic?",
        ],
        IntentType::GetPaperDetails => &[
            "Show this paper's citations",
            "Find similar papers",
            "Tell me more about the authors",
        ],
        IntentType::GetPaperCitations | IntentType::CitationNetwork => &[
            "Which citing paper is the most influential?",
            "Build the collaboration network for these authors",
        ],
        IntentType::SearchAuthors | IntentType::GetAuthorDetails => &[
            "List this author's papers",
            "Show their collaboration network",
        ],
        IntentType::GetAuthorPapers => &[
            "Which of these papers is the most cited?",
            "How has this author's focus changed over time?",
        ],
        IntentType::CollaborationNetwork => &[
            "Who are the central researchers in this network?",
        ],
        IntentType::GetTrendingPapers | IntentType::ResearchTrends | IntentType::ResearchLandscape => &[
            "What keywords define this trend?",
            "Search papers in the hottest subfield",
        ],
        IntentType::GetTopKeywords => &[
            "Search papers for the top keyword",
            "Which authors publish most on these topics?",
        ],
        IntentType::GeneralChat | IntentType::Unknown => &[
            "Search for papers on a topic",
            "Look up an author",
            "Show trending research",
        ],
    };
    suggestions.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_drops_error_results() {
        let mut results = HashMap::new();
        results.insert("ok".to_string(), json!({ "papers": [] }));
        results.insert("bad".to_string(), json!({ "error": "tool failed" }));

        let filtered = filter_results(&results);
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("ok"));
    }

    #[test]
    fn text_envelopes_with_json_payloads_are_unwrapped() {
        let envelope = json!({ "content": "{\"papers\": [{\"title\": \"A\"}]}", "type": "text" });
        let unwrapped = unwrap_envelope(&envelope);
        assert_eq!(unwrapped["papers"][0]["title"], "A");
    }

    #[test]
    fn plain_text_envelopes_keep_their_text()  {
        let envelope = json!({ "content": "just words", "type": "text" });
        assert_eq!(unwrap_envelope(&envelope), json!({ "text": "just words" }));
    }

    #[test]
    fn fallback_template_lists_at_most_three_insights() {
        let summary = StrategySummary {
            summary: json!({ "total_papers": 4 }),
            insights: (1..=5).map(|i| format!("insight {i}")).collect(),
            recommendations: Vec::new(),
        };
        let content = fallback_content(&summary);
        assert!(content.starts_with("Based on your query"));
        assert!(content.contains("insight 3"));
        assert!(!content.contains("insight 4"));
    }

    #[test]
    fn every_intent_has_follow_ups() {
        assert!(!follow_up_suggestions(IntentType::SearchPapers).is_empty());
        assert!(!follow_up_suggestions(IntentType::Unknown).is_empty());
    }
}
