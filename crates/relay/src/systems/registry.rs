use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::handler::ToolHandler;
use super::system::System;
use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

lazy_static! {
    static ref TOOL_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").unwrap();
}

/// A system that dispatches tool calls to registered handlers by name
pub struct ToolRegistry {
    name: String,
    description: String,
    tools: Vec<Tool>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new<N, D>(name: N, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Self {
            name: name.into(),
            description: description.into(),
            tools: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under the name of its tool
    ///
    /// The catalog keeps registration order. Names must be unique and match
    /// `[a-zA-Z0-9_-]{1,64}`, which is what the model API accepts.
    pub fn register<H>(&mut self, handler: H) -> AgentResult<()>
    where
        H: ToolHandler + 'static,
    {
        let tool = handler.tool();
        if !TOOL_NAME.is_match(&tool.name) {
            return Err(AgentError::Internal(format!(
                "Invalid tool name '{}', it must match [a-zA-Z0-9_-]{{1,64}}",
                tool.name
            )));
        }
        if self.handlers.contains_key(&tool.name) {
            return Err(AgentError::Internal(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }

        debug!(system = %self.name, tool = %tool.name, "registered tool");
        self.handlers.insert(tool.name.clone(), Arc::new(handler));
        self.tools.push(tool);
        Ok(())
    }

    /// Builder form of [`ToolRegistry::register`]
    pub fn with_handler<H>(mut self, handler: H) -> AgentResult<Self>
    where
        H: ToolHandler + 'static,
    {
        self.register(handler)?;
        Ok(self)
    }
}

#[async_trait]
impl System for ToolRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn tools(&self) -> &[Tool] {
        info!(system = %self.name, count = self.tools.len(), "listing tools");
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>> {
        info!(
            system = %self.name,
            tool = %tool_call.name,
            arguments = %tool_call.arguments,
            "executing tool"
        );

        let handler = self.handlers.get(&tool_call.name).ok_or_else(|| {
            warn!(system = %self.name, tool = %tool_call.name, "tool not found");
            AgentError::ToolNotFound(tool_call.name.clone())
        })?;

        let result = handler.execute(tool_call.arguments).await;
        match &result {
            Ok(contents) => debug!(
                tool = %tool_call.name,
                items = contents.len(),
                "tool returned"
            ),
            Err(e) => warn!(tool = %tool_call.name, error = %e, "tool failed"),
        }
        result
    }
}
