use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::errors::{ExchangeError, ExchangeResult};
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// A parsed reply from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Assistant message holding the response content blocks in order
    pub message: Message,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

/// Base trait for model providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send the conversation and tool catalog, returning the parsed reply
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> ExchangeResult<ModelResponse>;

    /// First request of an exchange: the conversation so far plus the tool catalog
    async fn send_initial(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> ExchangeResult<ModelResponse> {
        debug!(messages = messages.len(), tools = tools.len(), "sending initial request");
        self.complete(messages, tools).await
    }

    /// Request carrying tool results back to the model
    ///
    /// Every tool use of an assistant turn must be answered by the user turn right after
    /// it, and every tool result must answer one of those tool uses.
    async fn send_follow_up(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> ExchangeResult<ModelResponse> {
        check_tool_linkage(messages)?;
        debug!(messages = messages.len(), "sending follow-up request");
        self.complete(messages, tools).await
    }
}

/// Verify that tool results pair up with the tool uses of the preceding assistant turn
pub fn check_tool_linkage(messages: &[Message]) -> ExchangeResult<()> {
    for (i, message) in messages.iter().enumerate() {
        let responses = message.tool_responses();
        if !responses.is_empty() {
            let requested: HashSet<&str> = match i.checked_sub(1).map(|prev| &messages[prev]) {
                Some(prev) if prev.role == Role::Assistant && message.role == Role::User => prev
                    .tool_requests()
                    .iter()
                    .map(|request| request.id.as_str())
                    .collect(),
                _ => HashSet::new(),
            };
            if let Some(orphan) = responses
                .iter()
                .find(|response| !requested.contains(response.id.as_str()))
            {
                return Err(ExchangeError::OrphanToolResult(orphan.id.clone()));
            }
        }

        if message.role == Role::Assistant {
            let answered: HashSet<&str> = messages
                .get(i + 1)
                .map(|next| {
                    next.tool_responses()
                        .iter()
                        .map(|response| response.id.as_str())
                        .collect()
                })
                .unwrap_or_default();
            if let Some(unresolved) = message
                .tool_requests()
                .iter()
                .find(|request| !answered.contains(request.id.as_str()))
            {
                return Err(ExchangeError::UnresolvedToolUse(unresolved.id.clone()));
            }
        }
    }
    Ok(())
}
