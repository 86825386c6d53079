//! The uniform response shape returned for every query.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::task::PlanStats;

/// Metadata describing how a response was produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Classified intent label.
    pub intent_type: String,
    /// Classifier confidence for that intent.
    pub confidence: f64,
    /// Response-shaping strategy that was selected, when integration ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// Ids of the tasks whose results fed the response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_sources: Vec<String>,
    /// Set when the response is an error apology.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Final response for one query.
///
/// Every exit path of the pipeline produces this same shape: integrated
/// answers, clarification requests, still-processing notices, and error
/// apologies alike.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Natural-language reply content.
    pub content: String,
    pub metadata: ResponseMetadata,
    /// Strategy-specific structured summary.
    #[serde(default)]
    pub structured_data: Value,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub follow_up_suggestions: Vec<String>,
    #[serde(default)]
    pub needs_clarification: bool,
    /// True for error apology responses.
    #[serde(default)]
    pub error: bool,
    /// Opaque id minted per query, for log correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_stats: Option<PlanStats>,
    /// End-to-end pipeline time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

impl AgentResponse {
    /// Bare response carrying only content.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: ResponseMetadata::default(),
            structured_data: Value::Null,
            insights: Vec::new(),
            recommendations: Vec::new(),
            follow_up_suggestions: Vec::new(),
            needs_clarification: false,
            error: false,
            query_id: None,
            conversation_id: None,
            task_stats: None,
            processing_time_ms: None,
        }
    }
}
