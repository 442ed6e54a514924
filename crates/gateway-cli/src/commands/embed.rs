//! Embed command - compute an embedding vector.

use anyhow::Result;
use clap::Args;
use gateway_core::{EmbeddingsRequest, ProviderKind};
use gateway_providers::ProviderRegistry;
use serde::Serialize;

use crate::cli::parse_provider;
use crate::output::{self, CommandResult, OutputFormat};

/// Number of leading values shown in text output
const PREVIEW_LEN: usize = 8;

/// Arguments for the embed command.
#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Provider to call (openai, bedrock)
    #[arg(short, long, value_parser = parse_provider)]
    pub provider: ProviderKind,

    /// Embedding model id
    #[arg(short = 'M', long)]
    pub model: String,

    /// Text to embed
    #[arg(short, long)]
    pub input: String,

    /// Requested vector size, where the model supports it
    #[arg(short, long)]
    pub dimensions: Option<u32>,
}

/// Embedding output.
#[derive(Debug, Serialize)]
pub struct EmbedOutput {
    pub model: String,
    pub dimensions: usize,
    pub input_tokens: u64,
    pub embedding: Vec<f32>,
}

fn preview(embedding: &[f32]) -> String {
    let head: Vec<String> = embedding
        .iter()
        .take(PREVIEW_LEN)
        .map(|value| format!("{value:.4}"))
        .collect();
    if embedding.len() > PREVIEW_LEN {
        format!("[{}, ...]", head.join(", "))
    } else {
        format!("[{}]", head.join(", "))
    }
}

/// Execute the embed command.
pub async fn execute(args: EmbedArgs, registry: &ProviderRegistry, format: OutputFormat) -> Result<()> {
    let provider = registry.adapter(args.provider, &args.model)?;

    let mut request = EmbeddingsRequest::new(&args.model, &args.input);
    if let Some(dimensions) = args.dimensions {
        request = request.with_dimensions(dimensions);
    }

    let result = provider.embed(&request).await;

    match format {
        OutputFormat::Json => {
            let result = match result {
                Ok(response) => CommandResult::success(EmbedOutput {
                    model: args.model,
                    dimensions: response.embedding.len(),
                    input_tokens: response.metadata.usage.input_tokens,
                    embedding: response.embedding,
                }),
                Err(e) => CommandResult::failure(e.to_string()),
            };
            result.print(format)?;
        }
        OutputFormat::Text => match result {
            Ok(response) => {
                output::success(&format!(
                    "Embedding with {} dimensions",
                    response.embedding.len()
                ));
                output::key_value("Input tokens", &output::format_tokens(response.metadata.usage.input_tokens));
                output::key_value("Vector", &preview(&response.embedding));
            }
            Err(e) => output::error(&format!("Embedding failed: {e}")),
        },
    }

    Ok(())
}
