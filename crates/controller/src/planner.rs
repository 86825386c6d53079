//! Task planning: turns an intent analysis into a validated task plan.

use serde_json::{json, Value};
use tracing::debug;

use scholar_agent_core::{
    Intent, IntentAnalysis, IntentType, Parameters, Result, Task, TaskBuilder, TaskPlan,
};

/// Builds task plans from classified intents.
///
/// Stateless; the intent-to-tool mapping is a fixed table, so planning never
/// consults the LLM.
#[derive(Debug, Default)]
pub struct TaskPlanner;

impl TaskPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plan tasks for the primary intent followed by any secondary intents.
    ///
    /// Conversational intents produce an empty plan. The returned plan is
    /// validated: unique ids, known dependencies, no cycles.
    pub fn create_plan(&self, analysis: &IntentAnalysis) -> Result<TaskPlan> {
        let tasks: Vec<Task> = analysis
            .intents()
            .flat_map(|intent| self.tasks_for_intent(intent))
            .collect();
        let plan = TaskPlan::new(tasks);
        plan.validate()?;
        debug!(
            tasks = plan.tasks.len(),
            intents = ?analysis.labels(),
            "task plan created"
        );
        Ok(plan)
    }

    fn tasks_for_intent(&self, intent: &Intent) -> Vec<Task> {
        tools_for_intent(intent.intent_type)
            .iter()
            .map(|&tool_name| {
                TaskBuilder::tool_call(tool_name, prepare_tool_arguments(tool_name, &intent.parameters))
            })
            .collect()
    }

    /// Composite plan: search for a paper, then fetch its details. The
    /// details task depends on the search and picks its paper id up from the
    /// search result at execution time.
    pub fn paper_review_tasks(&self, intent: &Intent) -> Vec<Task> {
        let search = TaskBuilder::tool_call(
            "search_papers",
            prepare_tool_arguments("search_papers", &intent.parameters),
        );
        let details = TaskBuilder::tool_call("get_paper_details", json!({}));
        TaskBuilder::dependent_chain(vec![search, details])
    }

    /// Composite plan: gather trends and related papers concurrently, as
    /// source material for writing assistance.
    pub fn paper_generation_tasks(&self, intent: &Intent) -> Vec<Task> {
        let trends = TaskBuilder::tool_call(
            "get_trending_papers",
            prepare_tool_arguments("get_trending_papers", &intent.parameters),
        );
        let search = TaskBuilder::tool_call(
            "search_papers",
            prepare_tool_arguments("search_papers", &intent.parameters),
        );
        TaskBuilder::parallel_group(vec![trends, search], Vec::new())
    }
}

/// Fixed intent-to-tool mapping.
fn tools_for_intent(intent_type: IntentType) -> &'static [&'static str] {
    match intent_type {
        IntentType::SearchPapers => &["search_papers"],
        IntentType::GetPaperDetails => &["get_paper_details"],
        IntentType::GetPaperCitations => &["get_paper_citations"],
        IntentType::SearchAuthors => &["search_authors"],
        IntentType::GetAuthorDetails => &["search_authors"],
        IntentType::GetAuthorPapers => &["get_author_papers"],
        IntentType::CitationNetwork => &["get_paper_citations"],
        IntentType::CollaborationNetwork => &["search_authors"],
        IntentType::GetTrendingPapers => &["get_trending_papers"],
        IntentType::GetTopKeywords => &["get_top_keywords"],
        IntentType::ResearchTrends => &["get_trending_papers"],
        IntentType::ResearchLandscape => &["get_trending_papers"],
        IntentType::GeneralChat | IntentType::Unknown => &[],
    }
}

/// Shape intent parameters into the argument object one tool expects,
/// filling defaults for anything the intent left out.
fn prepare_tool_arguments(tool_name: &str, params: &Parameters) -> Value {
    let str_param = |keys: &[&str]| -> String {
        keys.iter()
            .find_map(|key| params.get(*key).and_then(Value::as_str))
            .unwrap_or("")
            .to_string()
    };
    let limit = params.get("limit").and_then(Value::as_u64).unwrap_or(10);

    match tool_name {
        "search_papers" => json!({
            "query": str_param(&["query", "title", "search_keywords"]),
            "limit": limit,
            "format": "json",
            "fields": params
                .get("fields")
                .cloned()
                .unwrap_or_else(|| json!(["title", "abstract", "authors"])),
        }),
        "get_paper_details" => json!({
            "title": str_param(&["paper_title", "title"]),
            "include_citations": params
                .get("include_citations")
                .and_then(Value::as_bool)
                .unwrap_or(true),
        }),
        "get_paper_citations" => json!({
            "paper_id": str_param(&["paper_id"]),
            "title": str_param(&["paper_title", "title"]),
            "depth": params.get("depth").and_then(Value::as_u64).unwrap_or(2),
        }),
        "search_authors" => json!({
            "query": str_param(&["author_name", "query", "name"]),
            "limit": limit,
        }),
        "get_author_papers" => json!({
            "author_name": str_param(&["author_name", "name"]),
            "author_id": str_param(&["author_id"]),
            "limit": limit,
        }),
        "get_trending_papers" => {
            let time_range = match str_param(&["time_range"]) {
                s if s.is_empty() => "5years".to_string(),
                s => s,
            };
            json!({
                "field": str_param(&["field", "query"]),
                "time_range": time_range,
            })
        }
        "get_top_keywords" => json!({
            "field": str_param(&["field", "query"]),
            "limit": limit,
        }),
        _ => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_agent_core::TaskKind;

    fn analysis(intent: Intent) -> IntentAnalysis {
        IntentAnalysis::confident(intent)
    }

    #[test]
    fn search_intent_plans_one_tool_call_with_defaults() {
        let mut params = Parameters::new();
        params.insert("query".to_string(), json!("graph neural networks"));
        let plan = TaskPlanner::new()
            .create_plan(&analysis(Intent::new(IntentType::SearchPapers, 0.9, params)))
            .unwrap();

        assert_eq!(plan.tasks.len(), 1);
        let task = &plan.tasks[0];
        assert_eq!(task.kind, TaskKind::ToolCall);
        assert_eq!(task.parameters["tool_name"], "search_papers");
        let args = &task.parameters["arguments"];
        assert_eq!(args["query"], "graph neural networks");
        assert_eq!(args["limit"], 10);
        assert_eq!(args["format"], "json");
    }

    #[test]
    fn conversational_intents_plan_nothing() {
        let planner = TaskPlanner::new();
        for intent_type in [IntentType::GeneralChat, IntentType::Unknown] {
            let plan = planner
                .create_plan(&analysis(Intent::bare(intent_type, 0.9)))
                .unwrap();
            assert!(plan.tasks.is_empty());
        }
    }

    #[test]
    fn author_details_reuses_the_author_search_tool() {
        let mut params = Parameters::new();
        params.insert("author_name".to_string(), json!("Yoshua Bengio"));
        let plan = TaskPlanner::new()
            .create_plan(&analysis(Intent::new(IntentType::GetAuthorDetails, 0.9, params)))
            .unwrap();
        assert_eq!(plan.tasks[0].parameters["tool_name"], "search_authors");
        assert_eq!(plan.tasks[0].parameters["arguments"]["query"], "Yoshua Bengio");
    }

    #[test]
    fn secondary_intents_extend_the_plan_in_order() {
        let mut analysis = analysis(Intent::bare(IntentType::SearchPapers, 0.9));
        analysis.secondary.push(Intent::bare(IntentType::GetTrendingPapers, 0.6));
        let plan = TaskPlanner::new().create_plan(&analysis).unwrap();

        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[0].parameters["tool_name"], "search_papers");
        assert_eq!(plan.tasks[1].parameters["tool_name"], "get_trending_papers");
    }

    #[test]
    fn trending_defaults_to_five_year_window() {
        let plan = TaskPlanner::new()
            .create_plan(&analysis(Intent::bare(IntentType::ResearchTrends, 0.9)))
            .unwrap();
        assert_eq!(plan.tasks[0].parameters["tool_name"], "get_trending_papers");
        assert_eq!(plan.tasks[0].parameters["arguments"]["time_range"], "5years");
    }

    #[test]
    fn citation_depth_defaults_to_two() {
        let mut params = Parameters::new();
        params.insert("paper_id".to_string(), json!("p-42"));
        let plan = TaskPlanner::new()
            .create_plan(&analysis(Intent::new(IntentType::GetPaperCitations, 0.9, params)))
            .unwrap();
        let args = &plan.tasks[0].parameters["arguments"];
        assert_eq!(args["paper_id"], "p-42");
        assert_eq!(args["depth"], 2);
    }

    #[test]
    fn paper_review_chains_search_before_details() {
        let mut params = Parameters::new();
        params.insert("query".to_string(), json!("attention"));
        let tasks = TaskPlanner::new().paper_review_tasks(&Intent::new(
            IntentType::GetPaperDetails,
            0.9,
            params,
        ));

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].dependencies, vec![tasks[0].id.clone()]);
        assert!(!tasks[1].can_parallel);
        TaskPlan::new(tasks).validate().unwrap();
    }
}
