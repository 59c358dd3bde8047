use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AgentResult;
use crate::models::content::Content;
use crate::models::tool::Tool;

/// A single executable tool
///
/// Handlers are registered with a [`ToolRegistry`](super::ToolRegistry), which routes calls
/// to them by the name in their descriptor.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The descriptor advertised to the model
    fn tool(&self) -> Tool;

    /// Run the tool against the arguments the model supplied
    async fn execute(&self, arguments: Value) -> AgentResult<Vec<Content>>;
}
