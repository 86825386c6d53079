//! External research-tool collaborator interface.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Client for the external research-data tool service.
///
/// Any `Err` from `call` is treated as the calling task's failure; retries,
/// if any, live behind this interface.
#[async_trait]
pub trait ToolClient: Send + Sync {
    /// Invoke `tool_name` with the given arguments and return its raw result.
    async fn call(&self, tool_name: &str, arguments: &Value) -> Result<Value>;
}
