//! Intent classification.
//!
//! The classifier is total: LLM failures, malformed responses, and unknown
//! labels all degrade to keyword matching instead of surfacing an error, so
//! `analyze` always produces an [`IntentAnalysis`].

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use scholar_agent_core::{Intent, IntentAnalysis, IntentType, LlmClient, Parameters};

use crate::prompts;

/// Confidence below which every intent is sent back for clarification.
const CLARIFICATION_THRESHOLD: f64 = 0.7;

/// Conversation context fed into classification.
#[derive(Debug, Clone, Default)]
pub struct IntentContext {
    /// Intent labels of recent assistant turns, most recent last.
    pub recent_intents: Vec<String>,
    /// Number of messages in the conversation so far.
    pub conversation_length: usize,
}

/// Classifies user queries into research intents.
pub struct IntentClassifier {
    llm: Arc<dyn LlmClient>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Analyze one user query. Infallible: degraded inputs lower confidence
    /// or trigger clarification, they never abort the pipeline.
    pub async fn analyze(&self, query: &str, context: &IntentContext) -> IntentAnalysis {
        let prompt = build_prompt(query, context);
        match self.llm.classify_intent(&prompt).await {
            Ok(response) => {
                let analysis = self.from_llm_response(&response, query);
                debug!(
                    intent = %analysis.primary.intent_type,
                    confidence = analysis.primary.confidence,
                    needs_clarification = analysis.needs_clarification,
                    "intent classified"
                );
                analysis
            }
            Err(error) => {
                warn!(%error, "intent classification call failed, falling back to keyword matching");
                let mut analysis = self.keyword_analysis(query);
                if analysis.primary.intent_type == IntentType::Unknown {
                    analysis.primary.confidence = 0.1;
                }
                analysis
            }
        }
    }

    /// Interpret whatever shape the LLM returned.
    fn from_llm_response(&self, response: &Value, query: &str) -> IntentAnalysis {
        // Structured form: {"intent_type": ..., "confidence": ..., "parameters": {...}}
        if let Some(label) = response.get("intent_type") {
            let label = label
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| label.to_string());
            let confidence = response.get("confidence").and_then(Value::as_f64).unwrap_or(0.8);
            let parameters = response
                .get("parameters")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            let secondary = parse_secondary_intents(response, query);
            return self.finish(&label, confidence, parameters, secondary, query);
        }

        // Free-text analysis with an embedded JSON object somewhere in it.
        if let Some(text) = response.get("analysis").and_then(Value::as_str) {
            if let Some(embedded) = extract_json_object(text) {
                let label = embedded
                    .get("intent_type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                let confidence = embedded.get("confidence").and_then(Value::as_f64).unwrap_or(0.7);
                let parameters = embedded
                    .get("parameters")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                return self.finish(&label, confidence, parameters, Vec::new(), query);
            }
            return self.keyword_analysis(query);
        }

        // Unrecognized shape: keyword matching at halved confidence.
        let (intent_type, confidence, parameters) = extract_intent_from_text(query);
        let intent = Intent::new(intent_type, confidence * 0.5, parameters);
        self.finalize(intent, Vec::new())
    }

    /// Normalize a label (canonical, aliased, or garbage) into a typed
    /// intent and run the clarification policy.
    fn finish(
        &self,
        label: &str,
        confidence: f64,
        mut parameters: Parameters,
        secondary: Vec<Intent>,
        query: &str,
    ) -> IntentAnalysis {
        let (intent_type, confidence) = match label.parse::<IntentType>() {
            Ok(intent_type) => (intent_type, confidence),
            Err(()) => {
                let mapped = map_to_known_intent(label, query);
                debug!(label, mapped = %mapped, "remapped non-canonical intent label");
                (mapped, confidence * 0.8)
            }
        };
        if !parameters.contains_key("original_query") {
            parameters.insert("original_query".to_string(), json!(query));
        }
        self.finalize(Intent::new(intent_type, confidence, parameters), secondary)
    }

    fn keyword_analysis(&self, query: &str) -> IntentAnalysis {
        let (intent_type, confidence, parameters) = extract_intent_from_text(query);
        self.finalize(Intent::new(intent_type, confidence, parameters), Vec::new())
    }

    fn finalize(&self, mut intent: Intent, secondary: Vec<Intent>) -> IntentAnalysis {
        intent.confidence = intent.confidence.clamp(0.0, 1.0);
        let needs_clarification = should_clarify(&intent);
        let clarification_questions = if needs_clarification {
            clarification_questions(&intent)
        } else {
            Vec::new()
        };
        IntentAnalysis {
            primary: intent,
            secondary,
            needs_clarification,
            clarification_questions,
        }
    }
}

fn build_prompt(query: &str, context: &IntentContext) -> String {
    let mut prompt = prompts::intent_analysis_prompt();
    if !context.recent_intents.is_empty() {
        prompt.push_str(&format!(
            "\n\nConversation context: {} prior messages; recent intents: {}",
            context.conversation_length,
            context.recent_intents.join(", ")
        ));
    }
    prompt.push_str(&format!("\n\nUser query: {query}"));
    prompt
}

/// Best-effort parse of an optional `secondary_intents` array; entries with
/// unparseable labels are skipped.
fn parse_secondary_intents(response: &Value, query: &str) -> Vec<Intent> {
    let Some(entries) = response.get("secondary_intents").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let label = entry
                .get("type")
                .or_else(|| entry.get("intent_type"))
                .and_then(Value::as_str)?;
            let intent_type = label.parse::<IntentType>().ok()?;
            let confidence = entry.get("confidence").and_then(Value::as_f64).unwrap_or(0.5);
            let mut parameters = entry
                .get("parameters")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            if !parameters.contains_key("original_query") {
                parameters.insert("original_query".to_string(), json!(query));
            }
            Some(Intent::new(intent_type, confidence, parameters))
        })
        .collect()
}

/// First balanced JSON object embedded in free text, if any.
fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..start + offset + ch.len_utf8()];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }
    None
}

// =============================================================================
// Label Remapping
// =============================================================================

/// Common non-canonical labels LLMs produce.
const INTENT_ALIASES: &[(&str, IntentType)] = &[
    ("paper_search", IntentType::SearchPapers),
    ("search_paper", IntentType::SearchPapers),
    ("find_papers", IntentType::SearchPapers),
    ("paper_details", IntentType::GetPaperDetails),
    ("paper_detail", IntentType::GetPaperDetails),
    ("paper_info", IntentType::GetPaperDetails),
    ("citations", IntentType::GetPaperCitations),
    ("paper_citations", IntentType::GetPaperCitations),
    ("author_search", IntentType::SearchAuthors),
    ("find_authors", IntentType::SearchAuthors),
    ("author_details", IntentType::GetAuthorDetails),
    ("author_info", IntentType::GetAuthorDetails),
    ("author_papers", IntentType::GetAuthorPapers),
    ("papers_by_author", IntentType::GetAuthorPapers),
    ("trending", IntentType::GetTrendingPapers),
    ("hot_papers", IntentType::GetTrendingPapers),
    ("keywords", IntentType::GetTopKeywords),
    ("hot_topics", IntentType::GetTopKeywords),
    ("trend_analysis", IntentType::ResearchTrends),
    ("chat", IntentType::GeneralChat),
    ("greeting", IntentType::GeneralChat),
];

/// Remap a non-canonical label: alias table first, then partial containment
/// against the canonical labels, then keyword re-derivation from the query.
fn map_to_known_intent(label: &str, query: &str) -> IntentType {
    let normalized = label.trim().to_lowercase();

    for (alias, intent_type) in INTENT_ALIASES {
        if normalized == *alias {
            return *intent_type;
        }
    }

    for intent_type in [
        IntentType::SearchPapers,
        IntentType::GetPaperDetails,
        IntentType::GetPaperCitations,
        IntentType::SearchAuthors,
        IntentType::GetAuthorDetails,
        IntentType::GetAuthorPapers,
        IntentType::CitationNetwork,
        IntentType::CollaborationNetwork,
        IntentType::GetTrendingPapers,
        IntentType::GetTopKeywords,
        IntentType::ResearchTrends,
        IntentType::ResearchLandscape,
        IntentType::GeneralChat,
    ] {
        let canonical = intent_type.as_str();
        if normalized.contains(canonical) || canonical.contains(normalized.as_str()) {
            return intent_type;
        }
    }

    let (intent_type, _, _) = extract_intent_from_text(query);
    intent_type
}

// =============================================================================
// Keyword Fallback
// =============================================================================

/// Rules where every keyword must appear, checked in order.
const ALL_MATCH_RULES: &[(&[&str], IntentType)] = &[
    (&["citation", "network"], IntentType::CitationNetwork),
    (&["collaboration", "network"], IntentType::CollaborationNetwork),
    (&["trending", "paper"], IntentType::GetTrendingPapers),
    (&["hot", "topic"], IntentType::GetTopKeywords),
    (&["top", "keyword"], IntentType::GetTopKeywords),
    (&["paper", "citation"], IntentType::GetPaperCitations),
    (&["paper", "detail"], IntentType::GetPaperDetails),
    (&["author", "paper"], IntentType::GetAuthorPapers),
    (&["search", "author"], IntentType::SearchAuthors),
    (&["find", "author"], IntentType::SearchAuthors),
    (&["search", "paper"], IntentType::SearchPapers),
    (&["find", "paper"], IntentType::SearchPapers),
];

/// Weaker single-keyword hints, used when no all-match rule fires.
const SINGLE_KEYWORD_RULES: &[(&str, IntentType)] = &[
    ("citation", IntentType::GetPaperCitations),
    ("network", IntentType::CitationNetwork),
    ("trending", IntentType::GetTrendingPapers),
    ("trend", IntentType::ResearchTrends),
    ("keyword", IntentType::GetTopKeywords),
    ("author", IntentType::SearchAuthors),
    ("paper", IntentType::SearchPapers),
    ("hello", IntentType::GeneralChat),
    ("hi ", IntentType::GeneralChat),
    ("thanks", IntentType::GeneralChat),
    ("thank you", IntentType::GeneralChat),
];

/// Words stripped from the query before it becomes a search parameter.
const STOP_WORDS: &[&str] = &[
    "find", "search", "show", "get", "give", "list", "me", "for", "about", "on", "of", "the",
    "a", "an", "please", "paper", "papers", "author", "authors", "by", "details", "detail",
    "citations", "citation", "network", "trending", "top", "keywords", "keyword", "what",
    "are", "is", "in",
];

/// Pure keyword classification used when the LLM is unavailable or its
/// response is unusable.
fn extract_intent_from_text(query: &str) -> (IntentType, f64, Parameters) {
    let lowered = query.to_lowercase();

    let mut matched = None;
    for (keywords, intent_type) in ALL_MATCH_RULES {
        if keywords.iter().all(|kw| lowered.contains(kw)) {
            matched = Some((*intent_type, 0.8));
            break;
        }
    }
    if matched.is_none() {
        for (keyword, intent_type) in SINGLE_KEYWORD_RULES {
            if lowered.contains(keyword) {
                matched = Some((*intent_type, 0.6));
                break;
            }
        }
    }

    let (intent_type, confidence) = matched.unwrap_or((IntentType::Unknown, 0.3));
    let parameters = extract_parameters(intent_type, query, &lowered);
    (intent_type, confidence, parameters)
}

/// Per-intent parameter extraction from the raw query text.
fn extract_parameters(intent_type: IntentType, query: &str, lowered: &str) -> Parameters {
    let mut parameters = Parameters::new();
    let cleaned = strip_stop_words(lowered);

    match intent_type {
        IntentType::SearchPapers => {
            let value = if cleaned.is_empty() { query.trim() } else { &cleaned };
            parameters.insert("query".to_string(), json!(value));
        }
        IntentType::SearchAuthors | IntentType::GetAuthorDetails | IntentType::GetAuthorPapers => {
            if !cleaned.is_empty() {
                parameters.insert("author_name".to_string(), json!(cleaned));
            }
        }
        IntentType::GetPaperDetails | IntentType::GetPaperCitations => {
            // An explicit "id:<value>" token wins over a title guess.
            if let Some(id) = lowered
                .split_whitespace()
                .find_map(|token| token.strip_prefix("id:"))
            {
                parameters.insert("paper_id".to_string(), json!(id));
            } else if !cleaned.is_empty() {
                parameters.insert("paper_title".to_string(), json!(cleaned));
            }
        }
        IntentType::GetTrendingPapers
        | IntentType::GetTopKeywords
        | IntentType::ResearchTrends
        | IntentType::ResearchLandscape => {
            if !cleaned.is_empty() {
                parameters.insert("field".to_string(), json!(cleaned));
            }
        }
        IntentType::CitationNetwork | IntentType::CollaborationNetwork => {
            if !cleaned.is_empty() {
                parameters.insert("query".to_string(), json!(cleaned));
            }
        }
        IntentType::GeneralChat | IntentType::Unknown => {}
    }

    parameters.insert("original_query".to_string(), json!(query));
    parameters
}

fn strip_stop_words(lowered: &str) -> String {
    lowered
        .split_whitespace()
        .filter(|word| {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            !word.is_empty() && !STOP_WORDS.contains(&word)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Clarification Policy
// =============================================================================

/// Intents that never trigger the missing-parameter rule.
const NEVER_REQUIRES_PARAMETERS: &[IntentType] = &[
    IntentType::GeneralChat,
    IntentType::GetTrendingPapers,
    IntentType::GetTopKeywords,
    IntentType::ResearchTrends,
    IntentType::ResearchLandscape,
    IntentType::CitationNetwork,
    IntentType::CollaborationNetwork,
    IntentType::Unknown,
];

/// Parameter keys of which at least one must hold a non-empty value.
fn required_parameter_keys(intent_type: IntentType) -> Option<&'static [&'static str]> {
    match intent_type {
        IntentType::SearchPapers => Some(&["title", "query", "search_keywords"]),
        IntentType::GetPaperDetails => Some(&[
            "search_keywords",
            "keywords",
            "paper_id",
            "paper_title",
            "title",
            "query",
        ]),
        IntentType::GetPaperCitations => Some(&["paper_id", "paper_title", "title", "query"]),
        IntentType::SearchAuthors => Some(&[
            "search_keywords",
            "keywords",
            "query",
            "author_name",
            "name",
        ]),
        IntentType::GetAuthorDetails => Some(&[
            "search_keywords",
            "keywords",
            "query",
            "author_name",
            "author_id",
            "name",
        ]),
        IntentType::GetAuthorPapers => Some(&["author_name", "author_id"]),
        _ => None,
    }
}

fn should_clarify(intent: &Intent) -> bool {
    if intent.confidence < CLARIFICATION_THRESHOLD {
        return true;
    }
    if NEVER_REQUIRES_PARAMETERS.contains(&intent.intent_type) {
        return false;
    }
    match required_parameter_keys(intent.intent_type) {
        Some(keys) => !keys.iter().any(|key| intent.has_param(key)),
        // No rule registered: clarify when nothing usable was extracted.
        None => !intent
            .parameters
            .keys()
            .any(|key| key != "original_query" && intent.has_param(key)),
    }
}

fn clarification_questions(intent: &Intent) -> Vec<String> {
    match intent.intent_type {
        IntentType::SearchPapers => {
            vec!["What topic or keywords should I search papers for?".to_string()]
        }
        IntentType::GetPaperDetails => vec![
            "Which paper would you like details about? A title or paper id helps.".to_string(),
        ],
        IntentType::GetPaperCitations => vec![
            "Which paper's citations should I look up? Please provide a title or paper id."
                .to_string(),
        ],
        IntentType::SearchAuthors => {
            vec!["Which author or research area should I search for?".to_string()]
        }
        IntentType::GetAuthorDetails => {
            vec!["Which author would you like to know more about?".to_string()]
        }
        IntentType::GetAuthorPapers => {
            vec!["Whose papers should I list? Please give an author name or id.".to_string()]
        }
        IntentType::Unknown => vec![
            "I'm not sure what you're looking for. I can help with:".to_string(),
            "- Searching papers by topic or keywords".to_string(),
            "- Paper details and citation lookups".to_string(),
            "- Finding authors and their publications".to_string(),
            "- Citation and collaboration network analysis".to_string(),
            "- Trending papers and hot research topics".to_string(),
            "What would you like to do?".to_string(),
        ],
        _ => vec!["Could you describe what you are looking for in a bit more detail?".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_object_handles_surrounding_prose() {
        let text = r#"The user wants to search. {"intent_type": "search_papers", "confidence": 0.9, "parameters": {"query": "gnn"}} Hope that helps."#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["intent_type"], "search_papers");
        assert_eq!(value["parameters"]["query"], "gnn");
    }

    #[test]
    fn extract_json_object_ignores_braces_inside_strings() {
        let text = r#"prefix {"note": "braces } inside {", "intent_type": "unknown"} suffix"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["intent_type"], "unknown");
    }

    #[test]
    fn extract_json_object_rejects_text_without_json() {
        assert!(extract_json_object("no structured data here").is_none());
    }

    #[test]
    fn alias_labels_remap() {
        assert_eq!(
            map_to_known_intent("paper_search", "irrelevant"),
            IntentType::SearchPapers
        );
        assert_eq!(
            map_to_known_intent("hot_topics", "irrelevant"),
            IntentType::GetTopKeywords
        );
    }

    #[test]
    fn containment_remaps_decorated_labels() {
        assert_eq!(
            map_to_known_intent("intent.search_papers", "irrelevant"),
            IntentType::SearchPapers
        );
    }

    #[test]
    fn unmappable_label_falls_back_to_query_keywords() {
        assert_eq!(
            map_to_known_intent("frobnicate", "find papers about transformers"),
            IntentType::SearchPapers
        );
        assert_eq!(
            map_to_known_intent("frobnicate", "xyzzy"),
            IntentType::Unknown
        );
    }

    #[test]
    fn keyword_rules_prefer_all_match_over_single() {
        let (intent_type, confidence, _) = extract_intent_from_text("show the citation network");
        assert_eq!(intent_type, IntentType::CitationNetwork);
        assert_eq!(confidence, 0.8);

        let (intent_type, confidence, _) = extract_intent_from_text("anything with citation");
        assert_eq!(intent_type, IntentType::GetPaperCitations);
        assert_eq!(confidence, 0.6);
    }

    #[test]
    fn keyword_extraction_strips_stop_words() {
        let (intent_type, _, params) = extract_intent_from_text("find papers about deep learning");
        assert_eq!(intent_type, IntentType::SearchPapers);
        assert_eq!(params["query"], "deep learning");
        assert_eq!(params["original_query"], "find papers about deep learning");
    }

    #[test]
    fn paper_id_token_wins_over_title() {
        let (intent_type, _, params) = extract_intent_from_text("paper details id:abc123");
        assert_eq!(intent_type, IntentType::GetPaperDetails);
        assert_eq!(params["paper_id"], "abc123");
        assert!(params.get("paper_title").is_none());
    }

    #[test]
    fn low_confidence_always_clarifies() {
        let intent = Intent::bare(IntentType::GetTrendingPapers, 0.4);
        assert!(should_clarify(&intent));
    }

    #[test]
    fn search_without_query_clarifies() {
        let mut params = Parameters::new();
        params.insert("original_query".to_string(), json!("papers"));
        let intent = Intent::new(IntentType::SearchPapers, 0.9, params);
        assert!(should_clarify(&intent));

        let mut params = Parameters::new();
        params.insert("query".to_string(), json!("transformers"));
        let intent = Intent::new(IntentType::SearchPapers, 0.9, params);
        assert!(!should_clarify(&intent));
    }

    #[test]
    fn exempt_intents_never_clarify_on_parameters() {
        for intent_type in [
            IntentType::GeneralChat,
            IntentType::GetTrendingPapers,
            IntentType::GetTopKeywords,
            IntentType::CitationNetwork,
            IntentType::CollaborationNetwork,
            IntentType::Unknown,
        ] {
            assert!(!should_clarify(&Intent::bare(intent_type, 0.9)), "{intent_type}");
        }
    }

    #[test]
    fn unknown_intent_questions_offer_a_menu() {
        let questions = clarification_questions(&Intent::bare(IntentType::Unknown, 0.3));
        assert!(questions.len() > 3);
        assert!(questions[0].contains("I can help with"));
    }
}
