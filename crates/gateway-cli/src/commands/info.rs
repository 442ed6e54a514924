//! Info command - show version and provider connection status.

use anyhow::Result;
use clap::Args;
use gateway_core::{ProviderInfo, ProviderKind};
use gateway_providers::ProviderRegistry;
use serde::Serialize;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the info command.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Show build information
    #[arg(long)]
    pub build: bool,
}

/// Info output.
#[derive(Debug, Serialize)]
pub struct InfoOutput {
    pub version: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildInfo>,
    pub providers: Vec<ProviderInfo>,
    pub unconfigured: Vec<ProviderKind>,
}

/// Build information.
#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub rust_version: String,
    pub os: String,
    pub arch: String,
    pub profile: String,
}

fn collect(args: &InfoArgs, registry: &ProviderRegistry) -> InfoOutput {
    let build = args.build.then(|| BuildInfo {
        rust_version: env!("CARGO_PKG_RUST_VERSION").to_string(),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        profile: if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "release".to_string()
        },
    });

    let (providers, unconfigured) = ProviderKind::ALL.into_iter().fold(
        (Vec::new(), Vec::new()),
        |(mut providers, mut unconfigured), kind| {
            match registry.account(kind) {
                Ok(account) => providers.push(account.info()),
                Err(_) => unconfigured.push(kind),
            }
            (providers, unconfigured)
        },
    );

    InfoOutput {
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: "Model Gateway".to_string(),
        build,
        providers,
        unconfigured,
    }
}

/// Execute the info command.
pub fn execute(args: InfoArgs, registry: &ProviderRegistry, format: OutputFormat) -> Result<()> {
    let info = collect(&args, registry);

    match format {
        OutputFormat::Json => CommandResult::success(info).print(format)?,
        OutputFormat::Text => {
            output::section(&info.name);
            output::key_value("Version", &info.version);

            if let Some(ref build) = info.build {
                output::section("Build Information");
                output::key_value("Rust Version", &build.rust_version);
                output::key_value("OS", &build.os);
                output::key_value("Architecture", &build.arch);
                output::key_value("Profile", &build.profile);
            }

            output::section("Providers");
            for provider in &info.providers {
                output::status(&provider.name, provider.is_connected);
                let mut details: Vec<_> = provider.details.iter().collect();
                details.sort();
                for (key, value) in details {
                    output::key_value(key, value);
                }
                output::key_value(
                    "Costs",
                    if provider.costs_info_available { "available" } else { "unavailable" },
                );
            }
            for kind in &info.unconfigured {
                output::status(&format!("{kind} (not configured)"), false);
            }
        }
    }

    Ok(())
}
