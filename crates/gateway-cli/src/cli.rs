//! CLI argument definitions using clap.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gateway_config::{ConfigLoader, GatewayConfig};
use gateway_core::ProviderKind;
use gateway_providers::ProviderRegistry;
use gateway_telemetry::{LogFormat, LoggingConfig};
use std::path::PathBuf;

use crate::commands;
use crate::output::OutputFormat;

/// Model Gateway - invoke models across providers with one request shape
#[derive(Parser, Debug)]
#[command(name = "model-gateway")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (.toml, .yaml or .yml)
    #[arg(short, long, env = "MODEL_GATEWAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a chat request
    Chat(commands::chat::ChatArgs),

    /// Compute an embedding vector
    Embed(commands::embed::EmbedArgs),

    /// List models offered by the configured providers
    Models(commands::models::ModelsArgs),

    /// Show version and provider connection status
    Info(commands::info::InfoArgs),

    /// Show provider spend
    Costs(commands::costs::CostsArgs),
}

/// Parse a provider name for clap
pub fn parse_provider(value: &str) -> Result<ProviderKind, String> {
    value.parse().map_err(|e: gateway_core::GatewayError| e.to_string())
}

impl Cli {
    /// Load configuration from the file, if any, plus the environment.
    pub async fn load_config(&self) -> Result<GatewayConfig> {
        let loader = match &self.config {
            Some(path) => ConfigLoader::new().with_file(path),
            None => ConfigLoader::new(),
        };
        loader
            .load()
            .await
            .context("Failed to load configuration")
    }

    /// Logging settings: `-v` and `--json` win over the file.
    pub fn logging_config(&self, configured: &LoggingConfig) -> LoggingConfig {
        let mut logging = if self.verbose > 0 {
            LoggingConfig::from_verbosity(self.verbose).with_format(configured.format)
        } else {
            configured.clone()
        };
        if self.json {
            logging = logging.with_format(LogFormat::Json);
        }
        logging
    }

    /// Execute the CLI command.
    pub async fn execute(self, config: GatewayConfig) -> Result<()> {
        let format = OutputFormat::from_json_flag(self.json);
        let registry = ProviderRegistry::from_connection(&config.providers)
            .context("Failed to initialize providers")?;

        match self.command {
            Commands::Chat(args) => commands::chat::execute(args, &registry, format).await,
            Commands::Embed(args) => commands::embed::execute(args, &registry, format).await,
            Commands::Models(args) => commands::models::execute(args, &registry, format).await,
            Commands::Info(args) => commands::info::execute(args, &registry, format),
            Commands::Costs(args) => commands::costs::execute(args, &registry, format).await,
        }
    }
}
