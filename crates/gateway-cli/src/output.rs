//! Terminal rendering for gateway results.
//!
//! Commands hand gateway types (responses, usage, model catalogs, spend) to
//! the renderers here; `--json` output goes through [`CommandResult`].

use colored::Colorize;
use gateway_core::{CostRange, Modality, ModelInfo, ModelResponse, Usage, UsageCosts, UsageReport};
use serde::Serialize;
use std::io::{self, Write};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Colored text and tables
    Text,
    /// One pretty-printed JSON document
    Json,
}

impl OutputFormat {
    /// `--json` flag to format
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }
}

pub fn success(message: &str) {
    println!("{} {message}", "✓".green().bold());
}

pub fn error(message: &str) {
    eprintln!("{} {message}", "✗".red().bold());
}

pub fn warning(message: &str) {
    eprintln!("{} {message}", "⚠".yellow().bold());
}

pub fn info(message: &str) {
    println!("{} {message}", "ℹ".blue().bold());
}

pub fn key_value(key: &str, value: &str) {
    println!("  {}: {value}", key.bold());
}

pub fn section(title: &str) {
    println!("\n{}", title.bold().underline());
}

/// Connected / not connected marker followed by `label`
pub fn status(label: &str, connected: bool) {
    let marker = if connected { "●".green() } else { "●".red() };
    println!("  {marker} {label}");
}

/// Spinner shown while waiting on a provider
pub fn spinner(message: &str) -> indicatif::ProgressBar {
    let spinner = indicatif::ProgressBar::new_spinner();
    let style = indicatif::ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

/// Write a streamed token without a newline
pub fn stream_text(text: &str) {
    print!("{text}");
    io::stdout().flush().ok();
}

pub fn stream_newline() {
    println!();
}

/// Token count, `-` for zero
pub fn format_tokens(tokens: u64) -> String {
    if tokens == 0 {
        "-".to_string()
    } else {
        tokens.to_string()
    }
}

pub fn format_amount(amount: f64, currency: &str) -> String {
    format!("{amount:.2} {currency}")
}

/// `YYYY-MM-DD to YYYY-MM-DD`
pub fn format_period(range: &CostRange) -> String {
    format!(
        "{} to {}",
        range.start.format("%Y-%m-%d"),
        range.end.format("%Y-%m-%d")
    )
}

/// Labelled counters of one usage record
fn usage_lines(usage: &Usage) -> [(&'static str, String); 4] {
    [
        ("Input", format_tokens(usage.input_tokens)),
        ("Output", format_tokens(usage.output_tokens)),
        ("Cache read", format_tokens(usage.cache_read_input_tokens)),
        ("Total", format_tokens(usage.total_tokens())),
    ]
}

pub fn print_usage(usage: &Usage) {
    section("Token Usage");
    for (label, value) in usage_lines(usage) {
        key_value(label, &value);
    }
}

/// Usage attached to a completed stream
pub fn print_usage_report(report: &UsageReport) {
    match report {
        UsageReport::Known(usage) => print_usage(usage),
        UsageReport::Unknown => info("Usage not reported"),
    }
}

/// Response text, optionally prefixed and followed by its usage
pub fn print_response(response: &ModelResponse, prefix: Option<&str>, show_usage: bool) {
    match prefix {
        Some(prefix) => println!("{prefix}{}", response.content),
        None => println!("{}", response.content),
    }
    if show_usage {
        print_usage(response.usage());
    }
}

/// One catalog entry in the models table
#[derive(Debug, Tabled)]
pub struct ModelRow {
    #[tabled(rename = "Model ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Provider")]
    pub provider: String,
    #[tabled(rename = "Context")]
    pub context: String,
    #[tabled(rename = "Output")]
    pub output: String,
}

impl From<&ModelInfo> for ModelRow {
    fn from(model: &ModelInfo) -> Self {
        let output = if model.output_formats.contains(&Modality::Embedding) {
            "embedding"
        } else {
            "text"
        };
        Self {
            id: model.id.clone(),
            name: model.name.clone(),
            provider: model.provider.to_string(),
            context: model
                .max_input_tokens
                .map_or_else(|| "-".to_string(), |tokens| tokens.to_string()),
            output: output.to_string(),
        }
    }
}

/// Spend of one project in the costs table
#[derive(Debug, Tabled)]
pub struct ProjectCost {
    #[tabled(rename = "Project")]
    pub project: String,
    #[tabled(rename = "Amount")]
    pub amount: String,
}

/// Projects ordered by spend, largest first
pub fn project_rows(costs: &UsageCosts) -> Vec<ProjectCost> {
    let mut projects: Vec<_> = costs.by_project.iter().collect();
    projects.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
    projects
        .into_iter()
        .map(|(project, amount)| ProjectCost {
            project: project.clone(),
            amount: format_amount(*amount, &costs.currency),
        })
        .collect()
}

fn render_table<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return "  (no data)".to_string();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn print_models(models: &[ModelInfo]) {
    let rows: Vec<ModelRow> = models.iter().map(ModelRow::from).collect();
    println!("{}", render_table(&rows));
}

/// Spend summary followed by the per-project table
pub fn print_costs(title: &str, costs: &UsageCosts) {
    section(title);
    key_value("Period", &format_period(&costs.range));
    key_value("Total", &format_amount(costs.total, &costs.currency));
    println!();
    println!("{}", render_table(&project_rows(costs)));
}

/// Envelope for `--json` output
#[derive(Debug, Serialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// JSON document in `Json` mode; only the error line in `Text` mode
    pub fn print(&self, format: OutputFormat) -> anyhow::Result<()> {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(self)?),
            OutputFormat::Text => {
                if let Some(err) = &self.error {
                    error(err);
                }
            }
        }
        Ok(())
    }
}
