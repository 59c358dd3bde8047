use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::warn;

use super::base::{ModelResponse, Usage};
use crate::errors::{AgentError, ExchangeError, ExchangeResult};
use crate::models::message::{Message, MessageContent};
use crate::models::tool::{Tool, ToolCall};

/// Convert internal Message format to Anthropic's Messages API specification
///
/// A message made of a single text block is sent with plain string content, everything
/// else as an array of content blocks. Messages carrying the raw blocks of a model
/// response send those blocks unchanged.
pub fn messages_to_anthropic_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        if let Some(blocks) = &message.wire_content {
            messages_spec.push(json!({
                "role": message.role,
                "content": blocks,
            }));
            continue;
        }

        if let [MessageContent::Text(text)] = message.content.as_slice() {
            messages_spec.push(json!({
                "role": message.role,
                "content": text.text,
            }));
            continue;
        }

        let mut blocks = Vec::new();
        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    // The API rejects empty text blocks
                    if !text.text.is_empty() {
                        blocks.push(json!({
                            "type": "text",
                            "text": text.text,
                        }));
                    }
                }
                MessageContent::ToolRequest(request) => {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": request.id,
                        "name": request.tool_call.name,
                        "input": request.tool_call.arguments,
                    }));
                }
                MessageContent::ToolResponse(response) => {
                    let mut block = json!({
                        "type": "tool_result",
                        "tool_use_id": response.id,
                        "content": response.result_text(),
                    });
                    if response.is_error() {
                        block["is_error"] = json!(true);
                    }
                    blocks.push(block);
                }
            }
        }

        messages_spec.push(json!({
            "role": message.role,
            "content": blocks,
        }));
    }

    messages_spec
}

/// Convert internal Tool format to Anthropic's tool specification
pub fn tools_to_anthropic_spec(tools: &[Tool]) -> ExchangeResult<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(AgentError::Internal(format!("Duplicate tool name: {}", tool.name)).into());
        }

        result.push(json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": tool.input_schema,
        }));
    }

    Ok(result)
}

fn required_str<'a>(value: &'a Value, key: &str, context: &str) -> ExchangeResult<&'a str> {
    value.get(key).and_then(|v| v.as_str()).ok_or_else(|| {
        ExchangeError::MalformedResponse(format!("{} is missing string field '{}'", context, key))
    })
}

/// Convert the content blocks of an Anthropic response to an assistant Message
pub fn anthropic_response_to_message(response: &Value) -> ExchangeResult<Message> {
    let blocks = response
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| {
            ExchangeError::MalformedResponse("response has no content array".to_string())
        })?;

    let mut message = Message::assistant().with_wire_content(blocks.clone());
    for block in blocks {
        match required_str(block, "type", "content block")? {
            "text" => {
                message = message.with_text(required_str(block, "text", "text block")?);
            }
            "tool_use" => {
                let id = required_str(block, "id", "tool_use block")?;
                let name = required_str(block, "name", "tool_use block")?;
                let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                message = message.with_tool_request(id, ToolCall::new(name, input));
            }
            other => {
                warn!(block_type = other, "unsupported content block, passing it through as is");
            }
        }
    }

    Ok(message)
}

/// Read the token counters of an Anthropic response
pub fn get_usage(response: &Value) -> Usage {
    let usage = response.get("usage");
    let read = |key: &str| {
        usage
            .and_then(|u| u.get(key))
            .and_then(|v| v.as_i64())
            .and_then(|v| i32::try_from(v).ok())
    };

    let input_tokens = read("input_tokens");
    let output_tokens = read("output_tokens");
    let total_tokens = match (input_tokens, output_tokens) {
        (Some(input), Some(output)) => input.checked_add(output),
        _ => None,
    };

    Usage::new(input_tokens, output_tokens, total_tokens)
}

/// Parse a full Anthropic response body
pub fn anthropic_response_to_model_response(response: &Value) -> ExchangeResult<ModelResponse> {
    if response.get("role").and_then(|r| r.as_str()) == Some("user") {
        return Err(ExchangeError::MalformedResponse(
            "response role must be assistant".to_string(),
        ));
    }

    let message = anthropic_response_to_message(response)?;
    let model = required_str(response, "model", "response")?.to_string();
    let stop_reason = response
        .get("stop_reason")
        .and_then(|s| s.as_str())
        .map(String::from);

    Ok(ModelResponse {
        message,
        model,
        stop_reason,
        usage: get_usage(response),
    })
}
