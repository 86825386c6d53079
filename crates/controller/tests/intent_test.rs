//! Classifier behavior against scripted and failing LLMs.

use std::sync::Arc;

use serde_json::json;

use scholar_agent_controller::intent::{IntentClassifier, IntentContext};
use scholar_agent_core::mocks::MockLlm;
use scholar_agent_core::IntentType;

fn classifier(llm: MockLlm) -> IntentClassifier {
    IntentClassifier::new(Arc::new(llm))
}

#[tokio::test]
async fn structured_response_maps_directly() {
    let llm = MockLlm::new(
        vec![json!({
            "intent_type": "search_papers",
            "confidence": 0.92,
            "parameters": { "query": "graph neural networks" },
        })],
        Vec::new(),
    );
    let analysis = classifier(llm)
        .analyze("find papers about graph neural networks", &IntentContext::default())
        .await;

    assert_eq!(analysis.primary.intent_type, IntentType::SearchPapers);
    assert_eq!(analysis.primary.confidence, 0.92);
    assert_eq!(analysis.primary.param_str("query"), Some("graph neural networks"));
    assert_eq!(
        analysis.primary.param_str("original_query"),
        Some("find papers about graph neural networks")
    );
    assert!(!analysis.needs_clarification);
}

#[tokio::test]
async fn embedded_json_in_analysis_text_is_extracted() {
    let llm = MockLlm::new(
        vec![json!({
            "analysis": "The user wants authors. {\"intent_type\": \"search_authors\", \
                         \"confidence\": 0.85, \"parameters\": {\"author_name\": \"Hinton\"}}"
        })],
        Vec::new(),
    );
    let analysis = classifier(llm)
        .analyze("who is Hinton", &IntentContext::default())
        .await;

    assert_eq!(analysis.primary.intent_type, IntentType::SearchAuthors);
    assert_eq!(analysis.primary.confidence, 0.85);
    assert_eq!(analysis.primary.param_str("author_name"), Some("Hinton"));
}

#[tokio::test]
async fn non_canonical_label_is_remapped_with_penalty() {
    let llm = MockLlm::new(
        vec![json!({
            "intent_type": "paper_search",
            "confidence": 0.9,
            "parameters": { "query": "diffusion models" },
        })],
        Vec::new(),
    );
    let analysis = classifier(llm)
        .analyze("diffusion models papers", &IntentContext::default())
        .await;

    assert_eq!(analysis.primary.intent_type, IntentType::SearchPapers);
    assert!((analysis.primary.confidence - 0.72).abs() < 1e-9);
    assert!(!analysis.needs_clarification);
}

#[tokio::test]
async fn llm_failure_falls_back_to_keywords() {
    let analysis = classifier(MockLlm::failing())
        .analyze("find papers about transformers", &IntentContext::default())
        .await;

    assert_eq!(analysis.primary.intent_type, IntentType::SearchPapers);
    assert_eq!(analysis.primary.confidence, 0.8);
    assert_eq!(analysis.primary.param_str("query"), Some("transformers"));
    assert!(!analysis.needs_clarification);
}

#[tokio::test]
async fn llm_failure_with_unmatchable_query_yields_low_confidence_unknown() {
    let analysis = classifier(MockLlm::failing())
        .analyze("xyzzy", &IntentContext::default())
        .await;

    assert_eq!(analysis.primary.intent_type, IntentType::Unknown);
    assert_eq!(analysis.primary.confidence, 0.1);
    assert!(analysis.needs_clarification);
    assert!(analysis.clarification_questions.len() > 1);
}

#[tokio::test]
async fn confident_intent_with_missing_required_parameter_clarifies() {
    let llm = MockLlm::new(
        vec![json!({
            "intent_type": "search_papers",
            "confidence": 0.9,
            "parameters": { "query": "" },
        })],
        Vec::new(),
    );
    let analysis = classifier(llm)
        .analyze("search", &IntentContext::default())
        .await;

    assert!(analysis.needs_clarification);
    assert!(!analysis.clarification_questions.is_empty());
}

#[tokio::test]
async fn low_confidence_clarifies_even_with_parameters() {
    let llm = MockLlm::new(
        vec![json!({
            "intent_type": "get_paper_details",
            "confidence": 0.4,
            "parameters": { "paper_id": "p-1" },
        })],
        Vec::new(),
    );
    let analysis = classifier(llm)
        .analyze("that paper", &IntentContext::default())
        .await;

    assert!(analysis.needs_clarification);
}

#[tokio::test]
async fn secondary_intents_are_parsed_when_present() {
    let llm = MockLlm::new(
        vec![json!({
            "intent_type": "search_papers",
            "confidence": 0.9,
            "parameters": { "query": "llm agents" },
            "secondary_intents": [
                { "type": "get_trending_papers", "confidence": 0.6 },
                { "type": "not_a_real_intent", "confidence": 0.9 },
            ],
        })],
        Vec::new(),
    );
    let analysis = classifier(llm)
        .analyze("papers on llm agents and what's trending", &IntentContext::default())
        .await;

    assert_eq!(analysis.secondary.len(), 1);
    assert_eq!(analysis.secondary[0].intent_type, IntentType::GetTrendingPapers);
}

#[tokio::test]
async fn classification_is_deterministic_for_the_same_query() {
    let classifier = classifier(MockLlm::failing());
    let context = IntentContext::default();
    let first = classifier.analyze("show the citation network for bert", &context).await;
    let second = classifier.analyze("show the citation network for bert", &context).await;

    assert_eq!(first.primary.intent_type, second.primary.intent_type);
    assert_eq!(first.primary.confidence, second.primary.confidence);
    assert_eq!(first.primary.parameters, second.primary.parameters);
}
