//! Models command - list models offered by the configured providers.

use anyhow::Result;
use clap::Args;
use gateway_core::{ModelInfo, ProviderKind};
use gateway_providers::ProviderRegistry;

use crate::cli::parse_provider;
use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the models command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Only list models of this provider
    #[arg(short, long, value_parser = parse_provider)]
    pub provider: Option<ProviderKind>,

    /// Filter models by id or name
    #[arg(short, long)]
    pub filter: Option<String>,
}

fn matches_filter(model: &ModelInfo, filter: Option<&str>) -> bool {
    filter.map_or(true, |filter| {
        let filter = filter.to_lowercase();
        model.id.to_lowercase().contains(&filter) || model.name.to_lowercase().contains(&filter)
    })
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs, registry: &ProviderRegistry, format: OutputFormat) -> Result<()> {
    let kinds = match args.provider {
        Some(kind) => vec![kind],
        None => registry.kinds(),
    };

    if kinds.is_empty() {
        let result: CommandResult<Vec<ModelInfo>> =
            CommandResult::failure("No providers are configured");
        return result.print(format);
    }

    let spinner = (format == OutputFormat::Text).then(|| output::spinner("Fetching models..."));
    let mut models = Vec::new();
    let mut failures = Vec::new();
    for kind in kinds {
        let listed = match registry.account(kind) {
            Ok(account) => account.models().await,
            Err(e) => Err(e),
        };
        match listed {
            Ok(listed) => models.extend(
                listed
                    .into_iter()
                    .filter(|model| matches_filter(model, args.filter.as_deref())),
            ),
            Err(e) => failures.push(format!("{kind}: {e}")),
        }
    }
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    models.sort_by(|a, b| (a.provider.as_str(), &a.id).cmp(&(b.provider.as_str(), &b.id)));

    match format {
        OutputFormat::Json => {
            let result = if models.is_empty() && !failures.is_empty() {
                CommandResult::failure(failures.join("; "))
            } else {
                CommandResult::success(models)
            };
            result.print(format)?;
        }
        OutputFormat::Text => {
            for failure in &failures {
                output::error(&format!("Failed to fetch models from {failure}"));
            }
            if models.is_empty() {
                output::warning("No models found matching the criteria");
            } else {
                output::success(&format!("Found {} models", models.len()));
                println!();
                output::print_models(&models);
            }
        }
    }

    Ok(())
}
