//! Per-intent summarization of tool results.
//!
//! Pure functions: they turn the filtered task results into a structured
//! summary plus human-readable insights and recommendations, which the
//! integrator then renders into prose (via the LLM or a template).

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Value};

use scholar_agent_core::IntentType;

/// Structured output of one summarization strategy.
#[derive(Debug, Clone, Default)]
pub struct StrategySummary {
    /// Machine-readable summary, kept in the response as `structured_data`.
    pub summary: Value,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Fixed intent-to-strategy table.
pub fn select_strategy(intent_type: IntentType) -> &'static str {
    match intent_type {
        IntentType::SearchPapers => "paper_list",
        IntentType::GetPaperDetails => "paper_detail",
        IntentType::GetPaperCitations => "citation_analysis",
        IntentType::SearchAuthors => "author_list",
        IntentType::GetAuthorDetails => "author_detail",
        IntentType::GetAuthorPapers => "author_papers",
        IntentType::CitationNetwork | IntentType::CollaborationNetwork => "network_analysis",
        IntentType::GetTrendingPapers | IntentType::ResearchTrends | IntentType::ResearchLandscape => {
            "trending_papers"
        }
        IntentType::GetTopKeywords => "keyword_analysis",
        IntentType::GeneralChat => "general_chat",
        IntentType::Unknown => "clarification",
    }
}

/// Summarize the filtered task results under one strategy.
pub fn build_summary(strategy: &str, data: &BTreeMap<String, Value>) -> StrategySummary {
    match strategy {
        "paper_list" | "author_papers" => paper_list_summary(data),
        "paper_detail" => paper_detail_summary(data),
        "citation_analysis" => citation_summary(data),
        "author_list" | "author_detail" => author_summary(data),
        "network_analysis" => network_summary(data),
        "trending_papers" => trending_summary(data),
        "keyword_analysis" => keyword_summary(data),
        _ => general_summary(data),
    }
}

// =============================================================================
// Strategies
// =============================================================================

fn paper_list_summary(data: &BTreeMap<String, Value>) -> StrategySummary {
    let papers = collect_items(data, "papers");
    if papers.is_empty() {
        return empty_summary("papers");
    }

    let years = papers.iter().filter_map(publication_year).collect::<Vec<_>>();
    let year_range = match (years.iter().min(), years.iter().max()) {
        (Some(min), Some(max)) => json!({ "from": min, "to": max }),
        _ => Value::Null,
    };
    let top_authors = top_counts(papers.iter().flat_map(author_names), 3);
    let top_venues = top_counts(papers.iter().filter_map(venue_name), 3);
    let most_cited = most_cited(&papers, 3);
    let avg_citations =
        papers.iter().map(citation_count).sum::<u64>() as f64 / papers.len() as f64;

    let mut insights = vec![format!("Found {} papers.", papers.len())];
    if let Some((author, count)) = top_authors.first() {
        insights.push(format!("Most frequent author: {author} ({count} papers)."));
    }
    if let (Some(min), Some(max)) = (years.iter().min(), years.iter().max()) {
        insights.push(format!("Publications span {min} to {max}."));
    }
    if let Some(paper) = most_cited.first() {
        if let Some(title) = paper.get("title").and_then(Value::as_str) {
            insights.push(format!(
                "Most cited result: \"{title}\" ({} citations).",
                citation_count(paper)
            ));
        }
    }

    StrategySummary {
        summary: json!({
            "total_papers": papers.len(),
            "year_range": year_range,
            "top_authors": counts_to_json(&top_authors),
            "top_venues": counts_to_json(&top_venues),
            "most_cited": most_cited,
            "avg_citations": avg_citations,
        }),
        insights,
        recommendations: vec![
            "Ask for details on any paper in the list.".to_string(),
            "Narrow the search with a year range or venue if the list is too broad.".to_string(),
        ],
    }
}

fn paper_detail_summary(data: &BTreeMap<String, Value>) -> StrategySummary {
    let Some(paper) = data
        .values()
        .find(|v| v.get("title").is_some() || v.get("paper").is_some())
        .map(|v| v.get("paper").unwrap_or(v))
    else {
        return empty_summary("paper details");
    };

    let citations = citation_count(paper);
    let title = paper.get("title").and_then(Value::as_str).unwrap_or("(untitled)");
    let mut insights = vec![format!(
        "\"{title}\" has {citations} citations ({} impact).",
        impact_level(citations)
    )];
    if let Some(year) = publication_year(paper) {
        insights.push(format!("Published in {year}."));
    }

    StrategySummary {
        summary: json!({
            "title": title,
            "authors": author_names(paper).collect::<Vec<_>>(),
            "year": publication_year(paper),
            "citations": citations,
            "impact": impact_level(citations),
        }),
        insights,
        recommendations: vec![
            "Explore this paper's citation network to find related work.".to_string(),
            "Look up the authors to see their other publications.".to_string(),
        ],
    }
}

fn citation_summary(data: &BTreeMap<String, Value>) -> StrategySummary {
    let citations = collect_items(data, "citations");
    if citations.is_empty() {
        return empty_summary("citations");
    }
    let top = most_cited(&citations, 3);
    StrategySummary {
        summary: json!({
            "total_citations": citations.len(),
            "most_influential": top,
        }),
        insights: vec![format!("Found {} citing works.", citations.len())],
        recommendations: vec![
            "Follow the most influential citing papers to trace the idea's impact.".to_string(),
        ],
    }
}

fn author_summary(data: &BTreeMap<String, Value>) -> StrategySummary {
    let authors = collect_items(data, "authors");
    if authors.is_empty() {
        return empty_summary("authors");
    }

    let top_affiliations = top_counts(
        authors
            .iter()
            .filter_map(|a| a.get("affiliation").and_then(Value::as_str).map(str::to_string)),
        3,
    );
    let mut by_h_index = authors.clone();
    by_h_index.sort_by_key(|a| std::cmp::Reverse(a.get("h_index").and_then(Value::as_u64).unwrap_or(0)));
    by_h_index.truncate(3);

    let mut insights = vec![format!("Found {} authors.", authors.len())];
    if let Some(leader) = by_h_index.first() {
        if let (Some(name), Some(h)) = (
            leader.get("name").and_then(Value::as_str),
            leader.get("h_index").and_then(Value::as_u64),
        ) {
            insights.push(format!("Highest h-index: {name} (h = {h})."));
        }
    }

    StrategySummary {
        summary: json!({
            "total_authors": authors.len(),
            "top_by_h_index": by_h_index,
            "top_affiliations": counts_to_json(&top_affiliations),
        }),
        insights,
        recommendations: vec![
            "Ask for a specific author's papers or collaboration network.".to_string(),
        ],
    }
}

fn network_summary(data: &BTreeMap<String, Value>) -> StrategySummary {
    let Some(network) = data
        .values()
        .find(|v| v.get("nodes").is_some() && v.get("edges").is_some())
    else {
        return empty_summary("network data");
    };

    let nodes = network.get("nodes").and_then(Value::as_array).map_or(0, Vec::len);
    let edges = network.get("edges").and_then(Value::as_array).map_or(0, Vec::len);
    let density = network_density(nodes, edges);

    StrategySummary {
        summary: json!({
            "node_count": nodes,
            "edge_count": edges,
            "density": density,
        }),
        insights: vec![format!(
            "Network has {nodes} nodes and {edges} edges (density {density:.3})."
        )],
        recommendations: vec![
            "Inspect the highest-degree nodes: they are the key papers or researchers."
                .to_string(),
        ],
    }
}

fn trending_summary(data: &BTreeMap<String, Value>) -> StrategySummary {
    let papers = collect_items(data, "papers");
    if papers.is_empty() {
        return empty_summary("trending papers");
    }
    let top_authors = top_counts(papers.iter().flat_map(author_names), 3);
    let hottest = most_cited(&papers, 3);

    StrategySummary {
        summary: json!({
            "total_papers": papers.len(),
            "hottest": hottest,
            "active_authors": counts_to_json(&top_authors),
        }),
        insights: vec![format!("{} papers are trending in this window.", papers.len())],
        recommendations: vec![
            "Follow the hottest papers' keywords to track the trend over time.".to_string(),
        ],
    }
}

fn keyword_summary(data: &BTreeMap<String, Value>) -> StrategySummary {
    let keywords = collect_items(data, "keywords");
    if keywords.is_empty() {
        return empty_summary("keywords");
    }
    let top = keywords.iter().take(5).cloned().collect::<Vec<_>>();
    let leader = top
        .first()
        .and_then(|k| {
            k.get("keyword")
                .or_else(|| k.get("name"))
                .and_then(Value::as_str)
        })
        .unwrap_or("(unknown)");

    StrategySummary {
        summary: json!({
            "total_keywords": keywords.len(),
            "top_keywords": top,
        }),
        insights: vec![format!("Hottest keyword right now: {leader}.")],
        recommendations: vec![format!("Search papers about \"{leader}\" to dig deeper.")],
    }
}

fn general_summary(data: &BTreeMap<String, Value>) -> StrategySummary {
    StrategySummary {
        summary: json!({ "data_sources": data.len() }),
        insights: Vec::new(),
        recommendations: Vec::new(),
    }
}

fn empty_summary(what: &str) -> StrategySummary {
    StrategySummary {
        summary: json!({ "total": 0 }),
        insights: vec![format!("No {what} were found for this query.")],
        recommendations: vec![
            "Try rephrasing the query or using broader keywords.".to_string(),
        ],
    }
}

// =============================================================================
// Extraction Helpers
// =============================================================================

/// Collect the arrays stored under `key` across every task result.
fn collect_items(data: &BTreeMap<String, Value>, key: &str) -> Vec<Value> {
    data.values()
        .filter_map(|v| v.get(key).and_then(Value::as_array))
        .flatten()
        .cloned()
        .collect()
}

/// Author names of a paper; tolerates both `["name", ...]` and
/// `[{"name": ...}, ...]` shapes.
fn author_names(paper: &Value) -> impl Iterator<Item = String> + '_ {
    paper
        .get("authors")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|author| match author {
            Value::String(name) => Some(name.clone()),
            Value::Object(fields) => fields.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
}

fn venue_name(paper: &Value) -> Option<String> {
    paper.get("venue").and_then(Value::as_str).map(str::to_string)
}

/// Publication year from a `year` number or a `published_at` date string.
fn publication_year(paper: &Value) -> Option<u64> {
    if let Some(year) = paper.get("year").and_then(Value::as_u64) {
        return Some(year);
    }
    paper
        .get("published_at")
        .and_then(Value::as_str)
        .and_then(|date| date.get(..4))
        .and_then(|prefix| prefix.parse().ok())
}

fn citation_count(paper: &Value) -> u64 {
    paper
        .get("citation_count")
        .or_else(|| paper.get("citations"))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

fn most_cited(papers: &[Value], k: usize) -> Vec<Value> {
    let mut sorted = papers.to_vec();
    sorted.sort_by_key(|p| std::cmp::Reverse(citation_count(p)));
    sorted.truncate(k);
    sorted
}

/// Top `k` most frequent values, ties broken alphabetically.
fn top_counts(items: impl Iterator<Item = String>, k: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(k);
    ranked
}

fn counts_to_json(counts: &[(String, usize)]) -> Value {
    Value::Array(
        counts
            .iter()
            .map(|(name, count)| json!({ "name": name, "count": count }))
            .collect(),
    )
}

fn impact_level(citations: u64) -> &'static str {
    match citations {
        c if c >= 100 => "high",
        c if c >= 20 => "medium",
        _ => "low",
    }
}

/// Directed graph density. Zero for degenerate graphs of at most one node.
fn network_density(nodes: usize, edges: usize) -> f64 {
    if nodes <= 1 {
        return 0.0;
    }
    edges as f64 / (nodes as f64 * (nodes as f64 - 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_with(key: &str, value: Value) -> BTreeMap<String, Value> {
        BTreeMap::from([(key.to_string(), value)])
    }

    #[test]
    fn strategy_table_covers_every_intent() {
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
            IntentType::Unknown,
        ] {
            assert!(!select_strategy(intent_type).is_empty());
        }
        assert_eq!(select_strategy(IntentType::CitationNetwork), "network_analysis");
        assert_eq!(select_strategy(IntentType::CollaborationNetwork), "network_analysis");
    }

    #[test]
    fn paper_list_extracts_authors_years_and_citations() {
        let data = data_with(
            "t1",
            json!({ "papers": [
                { "title": "A", "authors": ["Ada"], "year": 2020, "citation_count": 150 },
                { "title": "B", "authors": [{ "name": "Ada" }, { "name": "Grace" }], "year": 2023, "citations": 5 },
            ]}),
        );
        let result = build_summary("paper_list", &data);
        assert_eq!(result.summary["total_papers"], 2);
        assert_eq!(result.summary["year_range"], json!({ "from": 2020, "to": 2023 }));
        assert_eq!(result.summary["top_authors"][0]["name"], "Ada");
        assert_eq!(result.summary["most_cited"][0]["title"], "A");
        assert!(!result.insights.is_empty());
    }

    #[test]
    fn empty_results_still_produce_an_insight() {
        let result = build_summary("paper_list", &BTreeMap::new());
        assert_eq!(result.summary["total"], 0);
        assert!(result.insights[0].contains("No papers"));
    }

    #[test]
    fn network_density_is_guarded_for_tiny_graphs() {
        assert_eq!(network_density(0, 0), 0.0);
        assert_eq!(network_density(1, 5), 0.0);
        assert!((network_density(3, 3) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn network_summary_reports_counts_and_density() {
        let data = data_with(
            "t1",
            json!({ "nodes": [{}, {}, {}], "edges": [{}, {}, {}] }),
        );
        let result = build_summary("network_analysis", &data);
        assert_eq!(result.summary["node_count"], 3);
        assert_eq!(result.summary["edge_count"], 3);
        assert_eq!(result.summary["density"], 0.5);
    }

    #[test]
    fn publication_year_reads_date_strings() {
        assert_eq!(publication_year(&json!({ "year": 2021 })), Some(2021));
        assert_eq!(
            publication_year(&json!({ "published_at": "2019-06-01T00:00:00Z" })),
            Some(2019)
        );
        assert_eq!(publication_year(&json!({})), None);
    }

    #[test]
    fn impact_levels() {
        assert_eq!(impact_level(150), "high");
        assert_eq!(impact_level(50), "medium");
        assert_eq!(impact_level(3), "low");
    }
}
