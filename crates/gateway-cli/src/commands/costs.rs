//! Costs command - show provider spend.

use anyhow::Result;
use clap::Args;
use gateway_core::{CostRange, ProviderKind};
use gateway_providers::ProviderRegistry;

use crate::cli::parse_provider;
use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the costs command.
#[derive(Args, Debug)]
pub struct CostsArgs {
    /// Provider to query
    #[arg(short, long, value_parser = parse_provider)]
    pub provider: ProviderKind,

    /// Number of days up to now
    #[arg(short, long, default_value = "30")]
    pub days: i64,
}

/// Execute the costs command.
pub async fn execute(args: CostsArgs, registry: &ProviderRegistry, format: OutputFormat) -> Result<()> {
    let account = registry.account(args.provider)?;
    let range = CostRange::last_days(args.days);
    let result = account.costs(range).await;

    match format {
        OutputFormat::Json => {
            let result = match result {
                Ok(costs) => CommandResult::success(costs),
                Err(e) => CommandResult::failure(e.to_string()),
            };
            result.print(format)?;
        }
        OutputFormat::Text => match result {
            Ok(costs) => output::print_costs(&format!("{} spend", args.provider), &costs),
            Err(e) => output::error(&format!("Failed to fetch costs: {e}")),
        },
    }

    Ok(())
}
