use config::{Config, Environment};
use serde::Deserialize;
use thiserror::Error;

use crate::agent::ToolFailure;
use crate::providers::anthropic::{
    ANTHROPIC_HOST, ANTHROPIC_MODEL, DEFAULT_MAX_TOKENS, DEFAULT_TIMEOUT_SECS,
};
use crate::providers::configs::AnthropicProviderConfig;

/// Environment variable holding the API credential
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const ENV_PREFIX: &str = "RELAY";

/// Value shipped in sample `.env` files, never a usable key
const PLACEHOLDER_API_KEY: &str = "your-api-key-here";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing credential: set the {env_var} environment variable")]
    MissingCredential { env_var: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Map a config key such as `provider.model` to the variable that sets it
pub fn to_env_var(field: &str) -> String {
    if field.ends_with("api_key") {
        return API_KEY_ENV.to_string();
    }
    format!("{}_{}", ENV_PREFIX, field.to_uppercase().replace('.', "__"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    #[serde(default)]
    pub system: Option<String>,
}

impl ProviderSettings {
    // Convert to the provider config
    pub fn into_config(self) -> AnthropicProviderConfig {
        AnthropicProviderConfig {
            host: self.host,
            api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
            timeout_secs: self.timeout_secs,
            system: self.system,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    pub tool_failure: ToolFailure,
    pub max_rounds: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub provider: ProviderSettings,
    pub agent: AgentSettings,
}

impl Settings {
    /// Load settings from defaults and the environment, failing before any network call
    /// when the credential is absent
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| ConfigError::MissingCredential {
            env_var: API_KEY_ENV.to_string(),
        })?;

        let config = Config::builder()
            // Provider defaults
            .set_default("provider.host", ANTHROPIC_HOST)?
            .set_default("provider.model", ANTHROPIC_MODEL)?
            .set_default("provider.max_tokens", i64::from(DEFAULT_MAX_TOKENS))?
            .set_default("provider.timeout_secs", DEFAULT_TIMEOUT_SECS as i64)?
            // Agent defaults
            .set_default("agent.tool_failure", "abort")?
            .set_default("agent.max_rounds", 1i64)?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override("provider.api_key", api_key)?
            .build()?;

        let settings: Self = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let api_key = self.provider.api_key.trim();
        if api_key.is_empty() || api_key == PLACEHOLDER_API_KEY {
            return Err(ConfigError::MissingCredential {
                env_var: API_KEY_ENV.to_string(),
            });
        }
        if self.provider.max_tokens == 0 {
            return Err(ConfigError::Invalid(format!(
                "{} must be greater than zero",
                to_env_var("provider.max_tokens")
            )));
        }
        if self.agent.max_rounds == 0 {
            return Err(ConfigError::Invalid(format!(
                "{} must be at least 1",
                to_env_var("agent.max_rounds")
            )));
        }
        Ok(())
    }
}
