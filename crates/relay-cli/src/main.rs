use anyhow::{anyhow, Context, Result};
use bat::PrettyPrinter;
use clap::Parser;
use cliclack::spinner;
use console::style;
use dotenv::dotenv;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use relay::agent::{Agent, ToolFailure};
use relay::config::Settings;
use relay::providers::base::ModelResponse;
use relay::systems::MockSystem;

const SAMPLE_QUERIES: [&str; 2] = [
    "What's the weather in Tokyo?",
    "Search the customer database for Tanaka",
];

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Queries to send, in order (defaults to two sample queries)
    queries: Vec<String>,

    /// Model to use (can also be set via RELAY_PROVIDER__MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// API host (can also be set via RELAY_PROVIDER__HOST)
    #[arg(long)]
    host: Option<String>,

    /// Pause between queries, in milliseconds
    #[arg(long, default_value_t = 1000)]
    delay_ms: u64,

    /// Send tool failures back to the model instead of aborting the query
    #[arg(long)]
    report_tool_errors: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Ok(path) = dotenv() {
        eprintln!("Loaded environment from {:?}", path);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::new().context("Failed to load configuration")?;
    if let Some(model) = cli.model {
        settings.provider.model = model;
    }
    if let Some(host) = cli.host {
        settings.provider.host = host;
    }
    if cli.report_tool_errors {
        settings.agent.tool_failure = ToolFailure::Report;
    }

    let system = MockSystem::new()?;
    let agent = Agent::from_settings(settings, Box::new(system))?;

    let tool_names: Vec<&str> = agent
        .system()
        .tools()
        .iter()
        .map(|tool| tool.name.as_str())
        .collect();
    println!("{} {}", style("Tools:").bold(), tool_names.join(", "));

    let queries: Vec<String> = if cli.queries.is_empty() {
        SAMPLE_QUERIES.iter().map(|q| q.to_string()).collect()
    } else {
        cli.queries
    };

    for (i, query) in queries.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(cli.delay_ms)).await;
        }

        println!("{}", style("=".repeat(60)).dim());
        println!("{} {}\n", style("Query:").bold(), query);

        let spin = spinner();
        spin.start("awaiting reply");
        let result = agent.run(query).await;
        spin.stop("");

        // A failed query is reported and the remaining queries still run
        match result {
            Ok(response) => render_response(&response)?,
            Err(e) => {
                tracing::error!(query = %query, error = %e, "query failed");
                println!("{} {}", style("Error:").red().bold(), e);
            }
        }
        println!();
    }

    Ok(())
}

fn render_response(response: &ModelResponse) -> Result<()> {
    let text = response.message.text();
    PrettyPrinter::new()
        .input_from_bytes(text.as_bytes())
        .language("markdown")
        .print()
        .map_err(|e| anyhow!("Failed to render response: {}", e))?;

    let usage = &response.usage;
    println!(
        "\n{}",
        style(format!(
            "model: {}  stop: {}  tokens in/out: {}/{}",
            response.model,
            response.stop_reason.as_deref().unwrap_or("-"),
            usage
                .input_tokens
                .map_or_else(|| "-".to_string(), |t| t.to_string()),
            usage
                .output_tokens
                .map_or_else(|| "-".to_string(), |t| t.to_string()),
        ))
        .dim()
    );
    Ok(())
}
