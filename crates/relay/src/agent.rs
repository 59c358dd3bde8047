use futures::future::join_all;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::errors::ExchangeResult;
use crate::models::message::{Message, ToolRequest};
use crate::providers::anthropic::AnthropicProvider;
use crate::providers::base::{ModelResponse, Provider};
use crate::systems::System;

/// What to do when a tool call fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolFailure {
    /// Stop the exchange and return the tool error to the caller
    #[default]
    Abort,
    /// Send the error back to the model as an `is_error` tool result
    Report,
}

/// Agent integrates a foundational LLM with the system providing its tools
pub struct Agent {
    provider: Box<dyn Provider>,
    system: Box<dyn System>,
    tool_failure: ToolFailure,
    max_rounds: usize,
}

impl Agent {
    /// Create a new Agent that runs a single tool round and aborts on tool failures
    pub fn new(provider: Box<dyn Provider>, system: Box<dyn System>) -> Self {
        Self {
            provider,
            system,
            tool_failure: ToolFailure::default(),
            max_rounds: 1,
        }
    }

    /// Create an Agent talking to the Anthropic API as described by the settings
    pub fn from_settings(settings: Settings, system: Box<dyn System>) -> ExchangeResult<Self> {
        let provider = AnthropicProvider::new(settings.provider.into_config())?;
        Ok(Self::new(Box::new(provider), system)
            .with_tool_failure(settings.agent.tool_failure)
            .with_max_rounds(settings.agent.max_rounds))
    }

    pub fn with_tool_failure(mut self, tool_failure: ToolFailure) -> Self {
        self.tool_failure = tool_failure;
        self
    }

    /// Allow up to `max_rounds` tool rounds per exchange, at least one
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn system(&self) -> &dyn System {
        self.system.as_ref()
    }

    /// Run one exchange for the query and return the model's final response
    ///
    /// When the first response holds no tool requests it is returned as is. Otherwise the
    /// requested tools are executed, their results are sent back together with the
    /// conversation so far, and the reply to that request is returned.
    pub async fn run(&self, query: &str) -> ExchangeResult<ModelResponse> {
        let tools = self.system.tools();
        info!(system = self.system.name(), tools = tools.len(), query, "starting exchange");

        let mut messages = vec![Message::user().with_text(query)];
        let mut response = self.provider.send_initial(&messages, tools).await?;

        for round in 1..=self.max_rounds {
            let requests = response.message.tool_requests();
            if requests.is_empty() {
                info!(round, "no tool use, returning model response");
                return Ok(response);
            }

            info!(round, count = requests.len(), "executing tool requests");
            let tool_results = self.dispatch_tool_requests(&requests).await?;

            messages.push(response.message);
            messages.push(tool_results);
            response = self.provider.send_follow_up(&messages, tools).await?;
        }

        if response.message.has_tool_requests() {
            warn!(
                max_rounds = self.max_rounds,
                "tool round limit reached, returning response with pending tool requests"
            );
        }
        Ok(response)
    }

    /// Execute all requests concurrently and collect one tool result per request, in order
    async fn dispatch_tool_requests(&self, requests: &[&ToolRequest]) -> ExchangeResult<Message> {
        let futures: Vec<_> = requests
            .iter()
            .map(|request| self.system.call(request.tool_call.clone()))
            .collect();

        // Process all the futures in parallel but wait until all are finished
        let outputs = join_all(futures).await;

        let mut message = Message::user();
        for (request, output) in requests.iter().zip(outputs) {
            if let (ToolFailure::Abort, Err(e)) = (self.tool_failure, &output) {
                error!(id = %request.id, tool = %request.tool_call.name, error = %e, "tool call failed");
                return Err(e.clone().into());
            }
            message = message.with_tool_response(request.id.clone(), output);
        }
        Ok(message)
    }
}
