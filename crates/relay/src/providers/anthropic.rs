use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

use super::base::{ModelResponse, Provider};
use super::configs::AnthropicProviderConfig;
use super::utils::{
    anthropic_response_to_model_response, messages_to_anthropic_spec, tools_to_anthropic_spec,
};
use crate::errors::{ExchangeError, ExchangeResult};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const ANTHROPIC_MODEL: &str = "claude-3-7-sonnet-20250219";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_BETA: &str = "tools-2024-04-04";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn build_payload(&self, messages: &[Message], tools: &[Tool]) -> ExchangeResult<Value> {
        let mut payload = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": messages_to_anthropic_spec(messages),
            "tools": tools_to_anthropic_spec(tools)?,
        });

        if let Some(system) = &self.config.system {
            payload["system"] = json!(system);
        }

        Ok(payload)
    }

    async fn post(&self, payload: Value) -> ExchangeResult<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("anthropic-beta", ANTHROPIC_BETA)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "model API request failed");
            return Err(ExchangeError::Gateway {
                status: status.as_u16(),
                status_text: status_text(status, &body),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            ExchangeError::MalformedResponse(format!("response body is not JSON: {}", e))
        })
    }
}

/// Reason phrase for the status, falling back to the API's error type for codes without one
fn status_text(status: StatusCode, body: &str) -> String {
    if let Some(reason) = status.canonical_reason() {
        return reason.to_string();
    }
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/type")
                .and_then(|t| t.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| "Unknown".to_string())
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> ExchangeResult<ModelResponse> {
        let payload = self.build_payload(messages, tools)?;
        debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = tools.len(),
            "posting to messages API"
        );

        let response = self.post(payload).await?;
        let parsed = anthropic_response_to_model_response(&response)?;
        debug!(
            model = %parsed.model,
            stop_reason = ?parsed.stop_reason,
            input_tokens = ?parsed.usage.input_tokens,
            output_tokens = ?parsed.usage.output_tokens,
            "received model response"
        );

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AgentError;
    use crate::models::content::Content;
    use crate::models::message::MessageContent;
    use crate::models::tool::ToolCall;
    use crate::providers::base::Usage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(host: String) -> AnthropicProviderConfig {
        AnthropicProviderConfig {
            host,
            ..AnthropicProviderConfig::new("test_api_key")
        }
    }

    async fn setup_mock_server(response: ResponseTemplate) -> (MockServer, AnthropicProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test_api_key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(header("anthropic-beta", ANTHROPIC_BETA))
            .and(header("content-type", "application/json"))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        let provider = AnthropicProvider::new(test_config(mock_server.uri())).unwrap();
        (mock_server, provider)
    }

    fn weather_tool() -> Tool {
        Tool::new(
            "get_weather",
            "Get the weather for a city",
            json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            }),
        )
    }

    #[tokio::test]
    async fn test_complete_basic() {
        let response_body = json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "content": [{
                "type": "text",
                "text": "Hello! How can I assist you today?"
            }],
            "model": "claude-3-7-sonnet-20250219",
            "stop_reason": "end_turn",
            "stop_sequence": null,
            "usage": {
                "input_tokens": 12,
                "output_tokens": 15
            }
        });

        let (_, provider) =
            setup_mock_server(ResponseTemplate::new(200).set_body_json(response_body)).await;

        let messages = vec![Message::user().with_text("Hello?")];
        let response = provider.send_initial(&messages, &[]).await.unwrap();

        if let MessageContent::Text(text) = &response.message.content[0] {
            assert_eq!(text.text, "Hello! How can I assist you today?");
        } else {
            panic!("Expected Text content");
        }
        assert_eq!(response.model, "claude-3-7-sonnet-20250219");
        assert_eq!(response.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(response.usage, Usage::new(Some(12), Some(15), Some(27)));
    }

    #[tokio::test]
    async fn test_request_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(json!({
                "model": "claude-3-7-sonnet-20250219",
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": "What's the weather in Tokyo?"}],
                "tools": [{
                    "name": "get_weather",
                    "description": "Get the weather for a city",
                    "input_schema": {
                        "type": "object",
                        "properties": {"city": {"type": "string"}},
                        "required": ["city"]
                    }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "ok"}],
                "model": "claude-3-7-sonnet-20250219",
                "stop_reason": "end_turn"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = AnthropicProvider::new(test_config(mock_server.uri())).unwrap();
        let messages = vec![Message::user().with_text("What's the weather in Tokyo?")];
        provider
            .send_initial(&messages, &[weather_tool()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_catalog_sends_empty_tools() {
        let (mock_server, provider) = setup_mock_server(
            ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "ok"}],
                "model": "claude-3-7-sonnet-20250219",
                "stop_reason": "end_turn"
            })),
        )
        .await;

        let messages = vec![Message::user().with_text("Hi")];
        let response = provider.send_initial(&messages, &[]).await.unwrap();
        assert!(!response.message.has_tool_requests());

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["tools"], json!([]));
        assert!(body.get("system").is_none());
    }

    #[tokio::test]
    async fn test_system_prompt_is_sent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"system": "Answer briefly."})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "ok"}],
                "model": "claude-3-7-sonnet-20250219",
                "stop_reason": "end_turn"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = AnthropicProviderConfig {
            system: Some("Answer briefly.".to_string()),
            ..test_config(mock_server.uri())
        };
        let provider = AnthropicProvider::new(config).unwrap();
        provider
            .complete(&[Message::user().with_text("Hi")], &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_follow_up_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "messages": [
                    {"role": "user", "content": "What's the weather in Tokyo?"},
                    {"role": "assistant", "content": [
                        {"type": "tool_use", "id": "toolu_01", "name": "get_weather", "input": {"city": "Tokyo"}}
                    ]},
                    {"role": "user", "content": [
                        {"type": "tool_result", "tool_use_id": "toolu_01", "content": "sunny"}
                    ]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "It is sunny in Tokyo."}],
                "model": "claude-3-7-sonnet-20250219",
                "stop_reason": "end_turn"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = AnthropicProvider::new(test_config(mock_server.uri())).unwrap();
        let messages = vec![
            Message::user().with_text("What's the weather in Tokyo?"),
            Message::assistant()
                .with_tool_request("toolu_01", ToolCall::new("get_weather", json!({"city": "Tokyo"}))),
            Message::user().with_tool_response("toolu_01", Ok(vec![Content::text("sunny")])),
        ];
        let response = provider
            .send_follow_up(&messages, &[weather_tool()])
            .await
            .unwrap();
        assert_eq!(response.message.text(), "It is sunny in Tokyo.");
    }

    #[tokio::test]
    async fn test_follow_up_with_orphan_result_is_not_sent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let provider = AnthropicProvider::new(test_config(mock_server.uri())).unwrap();
        let messages = vec![
            Message::user().with_text("What's the weather in Tokyo?"),
            Message::assistant().with_text("Sure."),
            Message::user().with_tool_response(
                "toolu_01",
                Err(AgentError::ToolNotFound("get_weather".to_string())),
            ),
        ];
        let error = provider.send_follow_up(&messages, &[]).await.unwrap_err();
        assert!(matches!(error, ExchangeError::OrphanToolResult(_)));
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let (_, provider) = setup_mock_server(
            ResponseTemplate::new(401)
                .set_body_json(json!({"type": "error", "error": {"type": "authentication_error"}})),
        )
        .await;

        let error = provider
            .complete(&[Message::user().with_text("Hi")], &[])
            .await
            .unwrap_err();
        match error {
            ExchangeError::Gateway {
                status,
                status_text,
                body,
            } => {
                assert_eq!(status, 401);
                assert_eq!(status_text, "Unauthorized");
                assert!(body.contains("authentication_error"));
            }
            other => panic!("Expected gateway error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = AnthropicProvider::new(test_config(mock_server.uri())).unwrap();
        let error = provider
            .complete(&[Message::user().with_text("Hi")], &[])
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ExchangeError::Gateway { status: 529, ref status_text, .. } if status_text == "Unknown"
        ));
        assert_eq!(error.to_string(), "Model API error: 529 Unknown");
    }

    #[tokio::test]
    async fn test_unregistered_status_uses_error_type() {
        let (_, provider) = setup_mock_server(ResponseTemplate::new(529).set_body_json(json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        })))
        .await;

        let error = provider
            .complete(&[Message::user().with_text("Hi")], &[])
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "Model API error: 529 overloaded_error");
    }

    #[tokio::test]
    async fn test_request_timeout_is_transport_error() {
        let (mock_server, _) = setup_mock_server(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "model": "claude-3-7-sonnet-20250219",
                    "content": [{"type": "text", "text": "Too late"}]
                }))
                .set_delay(Duration::from_secs(3)),
        )
        .await;
        let provider = AnthropicProvider::new(AnthropicProviderConfig {
            timeout_secs: 1,
            ..test_config(mock_server.uri())
        })
        .unwrap();

        let error = provider
            .complete(&[Message::user().with_text("Hi")], &[])
            .await
            .unwrap_err();
        match error {
            ExchangeError::Transport(e) => assert!(e.is_timeout(), "unexpected error: {:?}", e),
            other => panic!("Expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop a listener to get a local port nothing listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let provider = AnthropicProvider::new(test_config(format!("http://127.0.0.1:{}", port)))
            .unwrap();

        let error = provider
            .complete(&[Message::user().with_text("Hi")], &[])
            .await
            .unwrap_err();
        assert!(matches!(error, ExchangeError::Transport(_)));
    }

    #[tokio::test]
    async fn test_body_not_json() {
        let (_, provider) =
            setup_mock_server(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;

        let error = provider
            .complete(&[Message::user().with_text("Hi")], &[])
            .await
            .unwrap_err();
        assert!(matches!(error, ExchangeError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_body_wrong_shape() {
        let (_, provider) =
            setup_mock_server(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
                .await;

        let error = provider
            .complete(&[Message::user().with_text("Hi")], &[])
            .await
            .unwrap_err();
        assert!(matches!(error, ExchangeError::MalformedResponse(_)));
    }
}
