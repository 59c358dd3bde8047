use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::errors::ExchangeResult;
use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{ModelResponse, Provider, Usage};

/// A mock provider that returns pre-configured responses and records every request
pub struct MockProvider {
    responses: Mutex<VecDeque<ExchangeResult<ModelResponse>>>,
    requests: Mutex<Vec<(Vec<Message>, Vec<Tool>)>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<ExchangeResult<ModelResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Wrap an assistant message the way the real provider would report it
    pub fn response(message: Message) -> ExchangeResult<ModelResponse> {
        let stop_reason = if message.has_tool_requests() {
            "tool_use"
        } else {
            "end_turn"
        };
        Ok(ModelResponse {
            message,
            model: "mock-model".to_string(),
            stop_reason: Some(stop_reason.to_string()),
            usage: Usage::new(Some(10), Some(5), Some(15)),
        })
    }

    /// Conversations and catalogs received so far, in call order
    pub fn requests(&self) -> Vec<(Vec<Message>, Vec<Tool>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> ExchangeResult<ModelResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), tools.to_vec()));

        let mut responses = self.responses.lock().unwrap();
        // Return an empty response if no more pre-configured responses
        responses
            .pop_front()
            .unwrap_or_else(|| Self::response(Message::assistant().with_text("")))
    }
}
