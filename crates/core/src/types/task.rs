//! Task and task-plan types for the execution engine.
//!
//! A `TaskPlan` is built once per query by the planner, mutated (status
//! transitions only) by the execution engine, and discarded when the query
//! completes. It is never persisted.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Kind of work a task performs.
///
/// Closed set, dispatched through an exhaustive match in the execution
/// engine. An out-of-contract task kind is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Call an external research-data tool.
    ToolCall,
    /// Free-form LLM generation.
    LlmGeneration,
    /// Wrap already-produced content into a response payload.
    ResponseGeneration,
}

/// Task lifecycle state. Terminal states are `Completed` and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One atomic unit of work with explicit dependencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique id within the plan.
    pub id: String,
    pub kind: TaskKind,
    /// Human-readable name, for logs.
    pub name: String,
    /// Kind-specific parameters (for tool calls: `tool_name` + `arguments`).
    pub parameters: Map<String, Value>,
    pub status: TaskStatus,
    /// Ids of tasks that must complete before this one may run.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Whether this task may run concurrently with other ready tasks.
    #[serde(default = "default_true")]
    pub can_parallel: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Task {
    /// A task is ready when it is pending and every dependency has completed.
    pub fn is_ready(&self, completed_ids: &HashSet<String>) -> bool {
        self.status == TaskStatus::Pending
            && self.dependencies.iter().all(|dep| completed_ids.contains(dep))
    }

    pub fn mark_started(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
    }

    /// Wall-clock execution time, if the task has started and finished.
    pub fn execution_time(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// Aggregate status counts for a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStats {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Ordered collection of tasks derived from one intent analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlan {
    pub tasks: Vec<Task>,
    pub created_at: DateTime<Utc>,
}

impl TaskPlan {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            created_at: Utc::now(),
        }
    }

    /// Tasks whose dependencies are all in `completed_ids`, in plan order.
    pub fn ready_tasks(&self, completed_ids: &HashSet<String>) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|t| t.is_ready(completed_ids))
            .map(|t| t.id.clone())
            .collect()
    }

    pub fn pending_tasks(&self) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .map(|t| t.id.clone())
            .collect()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// All tasks have reached a terminal state.
    pub fn is_completed(&self) -> bool {
        self.tasks.iter().all(|t| t.status.is_terminal())
    }

    pub fn stats(&self) -> PlanStats {
        let mut stats = PlanStats {
            total: self.tasks.len(),
            ..Default::default()
        };
        for task in &self.tasks {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Validate plan invariants: unique ids, in-plan dependencies, and
    /// acyclicity. Called at construction time so the engine's runtime
    /// stall escape stays a liveness valve, not a correctness mechanism.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for task in &self.tasks {
            if !ids.insert(task.id.as_str()) {
                return Err(Error::invalid_plan(format!("duplicate task id: {}", task.id)));
            }
        }

        for task in &self.tasks {
            for dep in &task.dependencies {
                if !ids.contains(dep.as_str()) {
                    return Err(Error::invalid_plan(format!(
                        "task {} depends on unknown task {}",
                        task.id, dep
                    )));
                }
            }
        }

        // Kahn's algorithm; any leftover node sits on a cycle.
        let mut in_degree: HashMap<&str, usize> = ids.iter().map(|id| (*id, 0)).collect();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for task in &self.tasks {
            for dep in &task.dependencies {
                *in_degree.entry(task.id.as_str()).or_insert(0) += 1;
                dependents.entry(dep.as_str()).or_default().push(task.id.as_str());
            }
        }
        let mut queue: Vec<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut visited = 0;
        while let Some(id) = queue.pop() {
            visited += 1;
            if let Some(next) = dependents.get(id) {
                for dep_id in next {
                    let deg = in_degree.get_mut(dep_id).expect("dependent id known");
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push(dep_id);
                    }
                }
            }
        }
        if visited != self.tasks.len() {
            return Err(Error::invalid_plan("cycle detected in task dependencies"));
        }

        Ok(())
    }
}

/// Builders for the task shapes the planner emits.
pub struct TaskBuilder;

impl TaskBuilder {
    fn base(kind: TaskKind, name: String, parameters: Map<String, Value>) -> Task {
        Task {
            id: Uuid::new_v4().to_string(),
            kind,
            name,
            parameters,
            status: TaskStatus::Pending,
            dependencies: Vec::new(),
            can_parallel: true,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    /// External tool call task.
    pub fn tool_call(tool_name: &str, arguments: Value) -> Task {
        let mut parameters = Map::new();
        parameters.insert("tool_name".to_string(), json!(tool_name));
        parameters.insert("arguments".to_string(), arguments);
        Self::base(
            TaskKind::ToolCall,
            format!("Call {tool_name}"),
            parameters,
        )
    }

    /// LLM generation task.
    pub fn llm_generation(prompt: &str, model_params: Value) -> Task {
        let mut parameters = Map::new();
        parameters.insert("prompt".to_string(), json!(prompt));
        parameters.insert("model_params".to_string(), model_params);
        Self::base(
            TaskKind::LlmGeneration,
            "LLM text generation".to_string(),
            parameters,
        )
    }

    /// Response formatting task. Serial by default: it usually needs all
    /// upstream data collected first.
    pub fn response_generation(content: &str, format_type: &str) -> Task {
        let mut parameters = Map::new();
        parameters.insert("content".to_string(), json!(content));
        parameters.insert("format_type".to_string(), json!(format_type));
        let mut task = Self::base(
            TaskKind::ResponseGeneration,
            "Generate response".to_string(),
            parameters,
        );
        task.can_parallel = false;
        task
    }

    /// Link tasks into a serial chain: each depends on its predecessor and
    /// loses parallelism.
    pub fn dependent_chain(mut tasks: Vec<Task>) -> Vec<Task> {
        let mut previous: Option<String> = None;
        for task in &mut tasks {
            if let Some(prev_id) = previous.take() {
                task.dependencies = vec![prev_id];
                task.can_parallel = false;
            }
            previous = Some(task.id.clone());
        }
        tasks
    }

    /// Give every task the same shared dependencies and mark the group
    /// parallel.
    pub fn parallel_group(mut tasks: Vec<Task>, shared_dependencies: Vec<String>) -> Vec<Task> {
        for task in &mut tasks {
            task.dependencies = shared_dependencies.clone();
            task.can_parallel = true;
        }
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str) -> Task {
        TaskBuilder::tool_call(name, json!({}))
    }

    #[test]
    fn ready_requires_pending_and_satisfied_deps() {
        let search = tool("search_papers");
        let mut details = tool("get_paper_details");
        details.dependencies = vec![search.id.clone()];
        details.can_parallel = false;

        let search_id = search.id.clone();
        let details_id = details.id.clone();
        let plan = TaskPlan::new(vec![search, details]);

        let mut completed = HashSet::new();
        assert_eq!(plan.ready_tasks(&completed), vec![search_id.clone()]);

        completed.insert(search_id);
        // search is still Pending here, so it stays "ready" too; the engine
        // is what flips statuses.
        assert!(plan.ready_tasks(&completed).contains(&details_id));
    }

    #[test]
    fn stats_count_every_status() {
        let mut a = tool("search_papers");
        let mut b = tool("search_authors");
        let c = tool("get_top_keywords");
        a.mark_started();
        a.mark_completed();
        b.mark_started();
        b.mark_failed("boom");

        let plan = TaskPlan::new(vec![a, b, c]);
        let stats = plan.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.running, 0);
        assert!(!plan.is_completed());
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let a = tool("search_papers");
        let mut b = tool("search_papers");
        b.id = a.id.clone();
        let plan = TaskPlan::new(vec![a, b]);
        assert!(matches!(plan.validate(), Err(Error::InvalidPlan(_))));
    }

    #[test]
    fn validate_rejects_unknown_dependency() {
        let mut a = tool("get_paper_details");
        a.dependencies = vec!["missing".to_string()];
        let plan = TaskPlan::new(vec![a]);
        assert!(matches!(plan.validate(), Err(Error::InvalidPlan(_))));
    }

    #[test]
    fn validate_rejects_cycles() {
        let mut a = tool("search_papers");
        let mut b = tool("get_paper_details");
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        a.dependencies = vec![b_id];
        b.dependencies = vec![a_id];
        let plan = TaskPlan::new(vec![a, b]);
        assert!(matches!(plan.validate(), Err(Error::InvalidPlan(_))));
    }

    #[test]
    fn dependent_chain_links_in_order() {
        let chained = TaskBuilder::dependent_chain(vec![tool("search_papers"), tool("get_paper_details")]);
        assert!(chained[0].dependencies.is_empty());
        assert_eq!(chained[1].dependencies, vec![chained[0].id.clone()]);
        assert!(!chained[1].can_parallel);
        TaskPlan::new(chained).validate().unwrap();
    }
}
