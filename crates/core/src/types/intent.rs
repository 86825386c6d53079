use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Intent Types (Classifier Output)
// =============================================================================

/// Dynamic parameter bag attached to an intent (search keywords, ids, ...).
pub type Parameters = Map<String, Value>;

/// Academic research intent classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    // Paper related
    SearchPapers,
    GetPaperDetails,
    GetPaperCitations,

    // Author related
    SearchAuthors,
    GetAuthorDetails,
    GetAuthorPapers,

    // Network analysis
    CitationNetwork,
    CollaborationNetwork,

    // Trend analysis
    GetTrendingPapers,
    GetTopKeywords,
    ResearchTrends,
    ResearchLandscape,

    // General chat
    GeneralChat,

    // Unknown intent
    Unknown,
}

impl IntentType {
    /// Canonical snake_case label for this intent.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchPapers => "search_papers",
            Self::GetPaperDetails => "get_paper_details",
            Self::GetPaperCitations => "get_paper_citations",
            Self::SearchAuthors => "search_authors",
            Self::GetAuthorDetails => "get_author_details",
            Self::GetAuthorPapers => "get_author_papers",
            Self::CitationNetwork => "citation_network",
            Self::CollaborationNetwork => "collaboration_network",
            Self::GetTrendingPapers => "get_trending_papers",
            Self::GetTopKeywords => "get_top_keywords",
            Self::ResearchTrends => "research_trends",
            Self::ResearchLandscape => "research_landscape",
            Self::GeneralChat => "general_chat",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "search_papers" => Self::SearchPapers,
            "get_paper_details" => Self::GetPaperDetails,
            "get_paper_citations" => Self::GetPaperCitations,
            "search_authors" => Self::SearchAuthors,
            "get_author_details" => Self::GetAuthorDetails,
            "get_author_papers" => Self::GetAuthorPapers,
            "citation_network" => Self::CitationNetwork,
            "collaboration_network" => Self::CollaborationNetwork,
            "get_trending_papers" => Self::GetTrendingPapers,
            "get_top_keywords" => Self::GetTopKeywords,
            "research_trends" => Self::ResearchTrends,
            "research_landscape" => Self::ResearchLandscape,
            "general_chat" => Self::GeneralChat,
            "unknown" => Self::Unknown,
            _ => return Err(()),
        })
    }
}

/// A single classified intent.
///
/// Immutable once produced by the classifier; downstream components only
/// read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    /// Classified intent type.
    #[serde(rename = "type")]
    pub intent_type: IntentType,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
    /// Extracted parameters (search keywords, paper/author ids, ...).
    #[serde(default)]
    pub parameters: Parameters,
}

impl Intent {
    pub fn new(intent_type: IntentType, confidence: f64, parameters: Parameters) -> Self {
        Self {
            intent_type,
            confidence,
            parameters,
        }
    }

    /// Intent with no extracted parameters.
    pub fn bare(intent_type: IntentType, confidence: f64) -> Self {
        Self::new(intent_type, confidence, Parameters::new())
    }

    /// Whether `key` holds a non-empty value.
    pub fn has_param(&self, key: &str) -> bool {
        match self.parameters.get(key) {
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Null) | None => false,
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
            Some(_) => true,
        }
    }

    /// Parameter as a string slice, if present and a string.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}

/// Full result of intent analysis for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentAnalysis {
    /// The primary classified intent.
    pub primary: Intent,
    /// Secondary intents, planned after the primary in order.
    #[serde(default)]
    pub secondary: Vec<Intent>,
    /// Whether the query needs clarification before planning.
    #[serde(default)]
    pub needs_clarification: bool,
    /// Natural-language clarification questions to surface to the user.
    #[serde(default)]
    pub clarification_questions: Vec<String>,
}

impl IntentAnalysis {
    /// Analysis with a confident primary intent and nothing else.
    pub fn confident(primary: Intent) -> Self {
        Self {
            primary,
            secondary: Vec::new(),
            needs_clarification: false,
            clarification_questions: Vec::new(),
        }
    }

    /// All intents in planning order: primary first, then secondaries.
    pub fn intents(&self) -> impl Iterator<Item = &Intent> {
        std::iter::once(&self.primary).chain(self.secondary.iter())
    }

    /// Distinct intent labels, for logging.
    pub fn labels(&self) -> BTreeSet<&'static str> {
        self.intents().map(|i| i.intent_type.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labels_round_trip() {
        for label in [
            "search_papers",
            "get_paper_details",
            "get_paper_citations",
            "search_authors",
            "get_author_details",
            "get_author_papers",
            "citation_network",
            "collaboration_network",
            "get_trending_papers",
            "get_top_keywords",
            "research_trends",
            "research_landscape",
            "general_chat",
            "unknown",
        ] {
            let parsed: IntentType = label.parse().unwrap();
            assert_eq!(parsed.as_str(), label);
        }
        assert!(IntentType::from_str("paper_search").is_err());
    }

    #[test]
    fn has_param_ignores_blank_values() {
        let mut params = Parameters::new();
        params.insert("query".to_string(), json!("   "));
        params.insert("field".to_string(), json!("machine learning"));
        params.insert("depth".to_string(), json!(2));
        let intent = Intent::new(IntentType::SearchPapers, 0.9, params);

        assert!(!intent.has_param("query"));
        assert!(intent.has_param("field"));
        assert!(intent.has_param("depth"));
        assert!(!intent.has_param("missing"));
    }
}
