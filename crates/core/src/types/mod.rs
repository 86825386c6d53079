//! Shared data model for the Scholar Agent pipeline.

pub mod conversation;
pub mod intent;
pub mod response;
pub mod task;

pub use conversation::{Conversation, Message};
pub use intent::{Intent, IntentAnalysis, IntentType, Parameters};
pub use response::{AgentResponse, ResponseMetadata};
pub use task::{PlanStats, Task, TaskBuilder, TaskKind, TaskPlan, TaskStatus};
