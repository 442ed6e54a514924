//! Chat command - send a request to a model.

use anyhow::Result;
use clap::Args;
use futures::StreamExt;
use gateway_core::{
    stream_events, ModelInvocationRequest, ModelMessage, ModelProvider, ProviderKind,
    StreamEvent, Usage,
};
use gateway_providers::ProviderRegistry;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::cli::parse_provider;
use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the chat command.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Provider to call (openai, yandex, bedrock)
    #[arg(short, long, value_parser = parse_provider)]
    pub provider: ProviderKind,

    /// Model id or URI
    #[arg(short = 'M', long)]
    pub model: String,

    /// Message to send (if not provided, reads from stdin)
    #[arg(short, long)]
    pub message: Option<String>,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Enable streaming output
    #[arg(long)]
    pub stream: bool,

    /// Temperature
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Top-p sampling parameter
    #[arg(long)]
    pub top_p: Option<f32>,

    /// Interactive chat mode
    #[arg(short, long)]
    pub interactive: bool,

    /// Show token usage
    #[arg(long)]
    pub show_usage: bool,
}

impl ChatArgs {
    fn request(&self, messages: Vec<ModelMessage>) -> gateway_core::GatewayResult<ModelInvocationRequest> {
        let mut builder = ModelInvocationRequest::builder()
            .model_id(&self.model)
            .messages(messages);
        if let Some(system) = &self.system {
            builder = builder.system_prompt(system);
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        if let Some(top_p) = self.top_p {
            builder = builder.top_p(top_p);
        }
        builder.build()
    }
}

/// Chat response for output.
#[derive(Debug, Serialize)]
pub struct ChatOutput {
    pub provider: ProviderKind,
    pub model: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Execute the chat command.
pub async fn execute(args: ChatArgs, registry: &ProviderRegistry, format: OutputFormat) -> Result<()> {
    let provider = registry.adapter(args.provider, &args.model)?;

    if args.interactive {
        run_interactive_mode(provider, &args).await
    } else {
        run_single_message(provider, &args, format).await
    }
}

/// Stream one request to stdout; returns the full text on success.
async fn stream_to_stdout(
    provider: Arc<dyn ModelProvider>,
    request: ModelInvocationRequest,
    show_usage: bool,
) -> Option<String> {
    let mut events = stream_events(provider, request);
    let mut result = None;

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Start => {}
            StreamEvent::Token(token) => output::stream_text(&token),
            StreamEvent::Complete { content, usage } => {
                output::stream_newline();
                if show_usage {
                    output::print_usage_report(&usage);
                }
                result = Some(content);
            }
            StreamEvent::Error(e) => {
                output::stream_newline();
                output::error(&format!("Stream error: {e}"));
            }
        }
    }
    result
}

/// Run a single message chat.
async fn run_single_message(
    provider: Arc<dyn ModelProvider>,
    args: &ChatArgs,
    format: OutputFormat,
) -> Result<()> {
    let message = if let Some(ref msg) = args.message {
        msg.clone()
    } else {
        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        input.trim().to_string()
    };

    if message.is_empty() {
        let result: CommandResult<()> = CommandResult::failure("No message provided");
        result.print(format)?;
        return Ok(());
    }

    let request = args.request(vec![ModelMessage::user(message)])?;

    if args.stream && format == OutputFormat::Text {
        stream_to_stdout(provider, request, args.show_usage).await;
        return Ok(());
    }

    match format {
        OutputFormat::Text => {
            let spinner = output::spinner("Generating response...");
            let result = provider.invoke(&request).await;
            spinner.finish_and_clear();

            match result {
                Ok(response) => output::print_response(&response, None, args.show_usage),
                Err(e) => output::error(&format!("Request failed: {e}")),
            }
        }
        OutputFormat::Json => {
            let result = match provider.invoke(&request).await {
                Ok(response) => CommandResult::success(ChatOutput {
                    provider: args.provider,
                    model: args.model.clone(),
                    usage: Some(*response.usage()),
                    content: response.content,
                }),
                Err(e) => CommandResult::failure(e.to_string()),
            };
            result.print(format)?;
        }
    }

    Ok(())
}

/// Run interactive chat mode.
async fn run_interactive_mode(provider: Arc<dyn ModelProvider>, args: &ChatArgs) -> Result<()> {
    output::info(&format!(
        "Interactive chat with {} on {} (type 'exit' to quit)",
        args.model, args.provider
    ));

    if let Some(ref system) = args.system {
        output::info(&format!("System: {system}"));
    }

    println!();

    let mut messages: Vec<ModelMessage> = Vec::new();

    loop {
        print!("You: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            output::info("Goodbye!");
            break;
        }

        if input.is_empty() {
            continue;
        }

        messages.push(ModelMessage::user(input));
        let request = args.request(messages.clone())?;

        if args.stream {
            print!("Assistant: ");
            io::stdout().flush()?;

            match stream_to_stdout(Arc::clone(&provider), request, args.show_usage).await {
                Some(content) if !content.is_empty() => messages.push(ModelMessage::assistant(content)),
                Some(_) => {}
                None => {
                    messages.pop();
                }
            }
        } else {
            let spinner = output::spinner("Thinking...");
            let result = provider.invoke(&request).await;
            spinner.finish_and_clear();

            match result {
                Ok(response) => {
                    output::print_response(&response, Some("Assistant: "), args.show_usage);
                    messages.push(ModelMessage::assistant(response.content));
                }
                Err(e) => {
                    output::error(&format!("Error: {e}"));
                    messages.pop();
                }
            }
        }

        println!();
    }

    Ok(())
}
