use async_trait::async_trait;
use serde_json::{json, Value};

use super::handler::ToolHandler;
use super::registry::ToolRegistry;
use super::system::System;
use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

const CUSTOMER_ROWS: [&str; 3] = [
    "Taro Tanaka (ID: 001)",
    "Hanako Sato (ID: 002)",
    "Jiro Yamada (ID: 003)",
];

const TABLES: [&str; 3] = ["customers", "orders", "products"];

const DEFAULT_LIMIT: u64 = 10;

fn required_str<'a>(arguments: &'a Value, key: &str) -> AgentResult<&'a str> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AgentError::InvalidParameters(format!("{} parameter required", key)))
}

/// Canned current-weather lookup
pub struct WeatherTool;

#[async_trait]
impl ToolHandler for WeatherTool {
    fn tool(&self) -> Tool {
        Tool::new(
            "get_weather",
            "Get the current weather for the given city",
            json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "The city to look up, e.g. Tokyo or Osaka"
                    },
                    "unit": {
                        "type": "string",
                        "enum": ["celsius", "fahrenheit"],
                        "description": "Temperature unit",
                        "default": "celsius"
                    }
                },
                "required": ["city"]
            }),
        )
    }

    async fn execute(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let city = required_str(&arguments, "city")?;
        let temperature = match arguments.get("unit").and_then(|v| v.as_str()) {
            None | Some("celsius") => "25°C",
            Some("fahrenheit") => "77°F",
            Some(other) => {
                return Err(AgentError::InvalidParameters(format!(
                    "unit must be celsius or fahrenheit, got {}",
                    other
                )))
            }
        };

        Ok(vec![Content::text(format!(
            "Current weather in {}: sunny, {}, humidity 60%, wind 3 m/s",
            city, temperature
        ))])
    }
}

/// Canned customer database search
pub struct SearchDatabaseTool;

#[async_trait]
impl ToolHandler for SearchDatabaseTool {
    fn tool(&self) -> Tool {
        Tool::new(
            "search_database",
            "Search the customer database and return matching records",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "table": {
                        "type": "string",
                        "enum": TABLES,
                        "description": "Table to search"
                    },
                    "limit": {
                        "type": "number",
                        "description": "Maximum number of records to return",
                        "default": DEFAULT_LIMIT
                    }
                },
                "required": ["query", "table"]
            }),
        )
    }

    async fn execute(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let query = required_str(&arguments, "query")?;
        let table = required_str(&arguments, "table")?;
        if !TABLES.contains(&table) {
            return Err(AgentError::InvalidParameters(format!(
                "table must be one of {}, got {}",
                TABLES.join(", "),
                table
            )));
        }
        let limit = match arguments.get("limit") {
            None | Some(Value::Null) => DEFAULT_LIMIT,
            Some(value) => value.as_u64().ok_or_else(|| {
                AgentError::InvalidParameters("limit must be a non-negative integer".into())
            })?,
        };

        let rows: Vec<String> = CUSTOMER_ROWS
            .iter()
            .take(limit as usize)
            .enumerate()
            .map(|(i, row)| format!("{}. {}", i + 1, row))
            .collect();
        let noun = if rows.len() == 1 { "result" } else { "results" };

        let mut text = format!(
            "Searched the {} table for \"{}\": found {} {}.",
            table,
            query,
            rows.len(),
            noun
        );
        for row in rows {
            text.push('\n');
            text.push_str(&row);
        }
        Ok(vec![Content::text(text)])
    }
}

/// A stand-in for an MCP server exposing `get_weather` and `search_database`
pub struct MockSystem {
    registry: ToolRegistry,
}

impl MockSystem {
    pub fn new() -> AgentResult<Self> {
        let registry = ToolRegistry::new("mock", "Mock MCP server with canned tool results")
            .with_handler(WeatherTool)?
            .with_handler(SearchDatabaseTool)?;
        Ok(Self { registry })
    }
}

#[async_trait]
impl System for MockSystem {
    fn name(&self) -> &str {
        self.registry.name()
    }

    fn description(&self) -> &str {
        self.registry.description()
    }

    fn tools(&self) -> &[Tool] {
        self.registry.tools()
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>> {
        self.registry.call(tool_call).await
    }
}
