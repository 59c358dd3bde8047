//! Tool backends the agent can call
//!
//! A [`System`] exposes a catalog of tools and executes calls against it. [`ToolRegistry`]
//! builds a system out of individual [`ToolHandler`]s, and [`MockSystem`] is a registry
//! preloaded with canned tools that stands in for a real MCP server.
mod handler;
mod mock;
mod registry;
mod system;

pub use handler::ToolHandler;
pub use mock::{MockSystem, SearchDatabaseTool, WeatherTool};
pub use registry::ToolRegistry;
pub use system::System;
