//! Model Gateway CLI
//!
//! Invoke models on OpenAI, Yandex Foundation Models and AWS Bedrock from the
//! command line through the gateway adapters.

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = cli.load_config().await?;

    if let Err(e) = gateway_telemetry::init_logging(&cli.logging_config(&config.logging)) {
        output::warning(&e.to_string());
    }

    if let Err(e) = cli.execute(config).await {
        tracing::error!(error = %e, "Command failed");
        return Err(e);
    }
    Ok(())
}
