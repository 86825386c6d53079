//! Dependency-aware task execution.
//!
//! Each round, ready tasks with `can_parallel` run concurrently via a
//! fan-out/fan-in join; the rest run serially in plan order. One task's
//! failure never aborts the batch, it becomes an error entry in the result
//! map and a `Failed` status on the task.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use scholar_agent_core::{
    ChatMessage, Error, GenerateOptions, LlmClient, Result, Task, TaskKind, TaskPlan, ToolClient,
};

/// Executes task plans against the tool service and the LLM.
pub struct ExecutionEngine {
    tools: Arc<dyn ToolClient>,
    llm: Arc<dyn LlmClient>,
}

impl ExecutionEngine {
    pub fn new(tools: Arc<dyn ToolClient>, llm: Arc<dyn LlmClient>) -> Self {
        Self { tools, llm }
    }

    /// Run the plan to completion and return results keyed by task id.
    ///
    /// Bounded at `2 * task_count` scheduling rounds; a round with pending
    /// tasks but nothing ready (unsatisfiable dependencies, typically a
    /// failed upstream) force-admits the first pending task so the loop
    /// always terminates.
    pub async fn execute(&self, plan: &mut TaskPlan, query_id: &str) -> HashMap<String, Value> {
        let mut results: HashMap<String, Value> = HashMap::new();
        let mut completed_ids: HashSet<String> = HashSet::new();
        let max_rounds = plan.tasks.len() * 2;
        let mut round = 0;

        info!(query_id, tasks = plan.tasks.len(), "starting plan execution");

        while !plan.is_completed() && round < max_rounds {
            round += 1;

            let mut ready = plan.ready_tasks(&completed_ids);
            if ready.is_empty() {
                let pending = plan.pending_tasks();
                if pending.is_empty() {
                    break;
                }
                warn!(
                    query_id,
                    round,
                    pending = pending.len(),
                    "no ready tasks but pending tasks remain, force-admitting one"
                );
                ready = vec![pending[0].clone()];
            }

            let (parallel, serial): (Vec<String>, Vec<String>) = ready
                .into_iter()
                .partition(|id| plan.task(id).map(|t| t.can_parallel).unwrap_or(false));

            debug!(
                query_id,
                round,
                parallel = parallel.len(),
                serial = serial.len(),
                "executing batch"
            );

            if !parallel.is_empty() {
                let mut futures = Vec::with_capacity(parallel.len());
                for id in &parallel {
                    let task = plan.task_mut(id).expect("ready task exists in plan");
                    task.mark_started();
                    let kind = task.kind;
                    let parameters = task.parameters.clone();
                    let id = id.clone();
                    futures.push(async move {
                        let outcome = self.run_task(kind, &parameters).await;
                        (id, outcome)
                    });
                }
                for (id, outcome) in join_all(futures).await {
                    self.record(plan, &mut results, &mut completed_ids, id, outcome);
                }
            }

            for id in serial {
                let task = plan.task_mut(&id).expect("ready task exists in plan");
                task.mark_started();
                let kind = task.kind;
                let parameters = substitute_dependency_results(task, &results);
                let outcome = self.run_task(kind, &parameters).await;
                self.record(plan, &mut results, &mut completed_ids, id, outcome);
            }
        }

        let stats = plan.stats();
        info!(
            query_id,
            rounds = round,
            completed = stats.completed,
            failed = stats.failed,
            "plan execution finished"
        );
        results
    }

    fn record(
        &self,
        plan: &mut TaskPlan,
        results: &mut HashMap<String, Value>,
        completed_ids: &mut HashSet<String>,
        id: String,
        outcome: Result<Value>,
    ) {
        let task = plan.task_mut(&id).expect("executed task exists in plan");
        match outcome {
            Ok(value) => {
                debug!(task_id = %id, task = %task.name, "task completed");
                task.mark_completed();
                results.insert(id.clone(), value);
                completed_ids.insert(id);
            }
            Err(error) => {
                warn!(task_id = %id, task = %task.name, %error, "task failed");
                let message = error.to_string();
                task.mark_failed(message.clone());
                results.insert(id, json!({ "error": message }));
            }
        }
    }

    async fn run_task(&self, kind: TaskKind, parameters: &Map<String, Value>) -> Result<Value> {
        match kind {
            TaskKind::ToolCall => {
                let tool_name = parameters
                    .get("tool_name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::task_execution("tool call task without tool_name"))?;
                let arguments = parameters
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| json!({}));
                let result = self.tools.call(tool_name, &arguments).await?;
                Ok(normalize_tool_result(result))
            }
            TaskKind::LlmGeneration => {
                let prompt = parameters
                    .get("prompt")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::task_execution("llm generation task without prompt"))?;
                let options = parameters
                    .get("model_params")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<GenerateOptions>(v).ok())
                    .unwrap_or_default();
                let text = self
                    .llm
                    .generate(&[ChatMessage::user(prompt)], &options)
                    .await?;
                Ok(json!({ "content": text, "type": "text" }))
            }
            TaskKind::ResponseGeneration => {
                let content = parameters
                    .get("content")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        Error::task_execution("response generation task without content")
                    })?;
                let format_type = parameters
                    .get("format_type")
                    .and_then(Value::as_str)
                    .unwrap_or("text");
                Ok(json!({ "formatted_content": content, "format": format_type }))
            }
        }
    }
}

/// Give every tool result a uniform object shape: plain text becomes a
/// `{content, type}` envelope, objects pass through.
fn normalize_tool_result(result: Value) -> Value {
    match result {
        Value::String(text) => json!({ "content": text, "type": "text" }),
        Value::Object(_) => result,
        other => json!({ "content": other.to_string(), "type": "unknown" }),
    }
}

/// Feed dependency outputs into a downstream task's arguments.
///
/// Currently one substitution exists: a `get_paper_details` task following a
/// search picks the first paper's id out of the dependency result.
fn substitute_dependency_results(task: &Task, results: &HashMap<String, Value>) -> Map<String, Value> {
    let mut parameters = task.parameters.clone();

    let is_detail_call = task.kind == TaskKind::ToolCall
        && parameters.get("tool_name").and_then(Value::as_str) == Some("get_paper_details");
    if !is_detail_call || task.dependencies.is_empty() {
        return parameters;
    }

    for dep_id in &task.dependencies {
        let Some(dep_result) = results.get(dep_id) else { continue };
        let Some(first_paper) = dep_result
            .get("papers")
            .and_then(Value::as_array)
            .and_then(|papers| papers.first())
            .and_then(Value::as_object)
        else {
            continue;
        };
        let paper_id = first_paper
            .get("id")
            .filter(|v| !v.is_null())
            .or_else(|| first_paper.get("paper_id").filter(|v| !v.is_null()));
        if let Some(paper_id) = paper_id {
            let arguments = parameters
                .entry("arguments".to_string())
                .or_insert_with(|| json!({}));
            if let Some(arguments) = arguments.as_object_mut() {
                arguments.insert("paper_id".to_string(), paper_id.clone());
            }
            break;
        }
    }
    parameters
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_agent_core::TaskBuilder;

    #[test]
    fn string_results_get_a_text_envelope() {
        let normalized = normalize_tool_result(json!("plain text"));
        assert_eq!(normalized["content"], "plain text");
        assert_eq!(normalized["type"], "text");

        let passthrough = normalize_tool_result(json!({ "papers": [] }));
        assert_eq!(passthrough, json!({ "papers": [] }));
    }

    #[test]
    fn detail_task_inherits_paper_id_from_search_result() {
        let search = TaskBuilder::tool_call("search_papers", json!({ "query": "bert" }));
        let mut details = TaskBuilder::tool_call("get_paper_details", json!({}));
        details.dependencies = vec![search.id.clone()];

        let mut results = HashMap::new();
        results.insert(
            search.id.clone(),
            json!({ "papers": [{ "id": "p-1", "title": "BERT" }, { "id": "p-2" }] }),
        );

        let parameters = substitute_dependency_results(&details, &results);
        assert_eq!(parameters["arguments"]["paper_id"], "p-1");
    }

    #[test]
    fn substitution_skips_results_without_papers() {
        let search = TaskBuilder::tool_call("search_papers", json!({}));
        let mut details = TaskBuilder::tool_call("get_paper_details", json!({ "title": "x" }));
        details.dependencies = vec![search.id.clone()];

        let mut results = HashMap::new();
        results.insert(search.id.clone(), json!({ "error": "tool failed" }));

        let parameters = substitute_dependency_results(&details, &results);
        assert_eq!(parameters["arguments"], json!({ "title": "x" }));
    }

    #[test]
    fn substitution_falls_back_to_paper_id_key() {
        let search = TaskBuilder::tool_call("search_papers", json!({}));
        let mut details = TaskBuilder::tool_call("get_paper_details", json!({}));
        details.dependencies = vec![search.id.clone()];

        let mut results = HashMap::new();
        results.insert(search.id.clone(), json!({ "papers": [{ "paper_id": 77 }] }));

        let parameters = substitute_dependency_results(&details, &results);
        assert_eq!(parameters["arguments"]["paper_id"], 77);
    }
}
