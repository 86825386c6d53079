//! Error types for Scholar Agent.

use thiserror::Error;

/// Result type alias using Scholar Agent's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Scholar Agent.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Classification
    // =========================================================================
    #[error("Intent classification error: {0}")]
    Classification(String),

    // =========================================================================
    // Planning
    // =========================================================================
    #[error("Invalid task plan: {0}")]
    InvalidPlan(String),

    #[error("Planning error: {0}")]
    Planning(String),

    // =========================================================================
    // Execution
    // =========================================================================
    #[error("Task execution failed: {0}")]
    TaskExecution(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool call failed: {0}")]
    ToolCall(String),

    // =========================================================================
    // Collaborators
    // =========================================================================
    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("Conversation store error: {0}")]
    Storage(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    // =========================================================================
    // Generic
    // =========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a classification error.
    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    /// Create an invalid plan error.
    pub fn invalid_plan(msg: impl Into<String>) -> Self {
        Self::InvalidPlan(msg.into())
    }

    /// Create a planning error.
    pub fn planning(msg: impl Into<String>) -> Self {
        Self::Planning(msg.into())
    }

    /// Create a task execution error.
    pub fn task_execution(msg: impl Into<String>) -> Self {
        Self::TaskExecution(msg.into())
    }

    /// Create a tool call error.
    pub fn tool_call(msg: impl Into<String>) -> Self {
        Self::ToolCall(msg.into())
    }

    /// Create an LLM provider error.
    pub fn llm_provider(msg: impl Into<String>) -> Self {
        Self::LlmProvider(msg.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
