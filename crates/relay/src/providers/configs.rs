use super::anthropic::{
    ANTHROPIC_HOST, ANTHROPIC_MODEL, DEFAULT_MAX_TOKENS, DEFAULT_TIMEOUT_SECS,
};

/// Connection and request settings for the Anthropic Messages API
#[derive(Debug, Clone, PartialEq)]
pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub system: Option<String>,
}

impl AnthropicProviderConfig {
    /// Config for the public API with default model and limits
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: ANTHROPIC_HOST.to_string(),
            api_key: api_key.into(),
            model: ANTHROPIC_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            system: None,
        }
    }
}
