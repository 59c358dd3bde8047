use async_trait::async_trait;

use crate::errors::AgentResult;
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

/// Core trait that defines a system that can be operated by an AI agent
///
/// This is the only interface a tool backend has to implement to be driven by an
/// [`Agent`](crate::agent::Agent).
#[async_trait]
pub trait System: Send + Sync {
    /// Get the name of the system
    fn name(&self) -> &str;

    /// Get the system description
    fn description(&self) -> &str;

    /// Get available tools
    fn tools(&self) -> &[Tool];

    /// Call a tool with the given arguments
    ///
    /// Fails with [`AgentError::ToolNotFound`](crate::errors::AgentError::ToolNotFound)
    /// when no tool with that name is part of [`System::tools`].
    async fn call(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>>;
}
