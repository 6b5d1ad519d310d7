//! Output formatting for queue state.
//!
//! Supports multiple output formats: table view, JSON and plain lines.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

use super::run_service::RunSummary;
use crate::domain::{ItemStatus, QueueStats};

/// Output format options.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Table listing for terminals.
    #[default]
    Table,
    /// JSON format for programmatic use.
    Json,
    /// One value per line, for shell pipelines.
    Plain,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "plain" | "text" => Ok(Self::Plain),
            _ => Err(format!("Unknown format: {s}. Use: table, json, plain")),
        }
    }
}

/// Formats listed items as a table.
pub fn format_status_table(items: &[ItemStatus]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "State", "Item"]);

    for item in items {
        table.add_row(vec![
            (item.position + 1).to_string(),
            item.state.to_string(),
            item.id.to_string(),
        ]);
    }

    table.to_string()
}

/// Formats listed items as `state<TAB>id` lines.
pub fn format_status_plain(items: &[ItemStatus]) -> String {
    items
        .iter()
        .map(|item| format!("{}\t{}", item.state, item.id))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Serialize)]
struct StatusDocument<'a> {
    stats: &'a QueueStats,
    items: &'a [ItemStatus],
}

/// Formats items and totals as JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_status_json(
    items: &[ItemStatus],
    stats: &QueueStats,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&StatusDocument { stats, items })
}

/// Formats queue totals.
pub fn format_stats(stats: &QueueStats, committed_total: usize) -> String {
    let mut out = String::new();

    out.push_str(&format!("{}\n", "📊 Queue".bold()));
    out.push_str(&format!("  Listed:    {}\n", stats.listed));
    out.push_str(&format!("  Done:      {}\n", stats.done.to_string().green()));
    out.push_str(&format!("  Pending:   {}\n", stats.pending.to_string().yellow()));
    out.push_str(&format!("  Committed: {committed_total} (all time)\n"));

    match &stats.next {
        Some(id) => out.push_str(&format!("  Next:      {}", id.to_string().cyan())),
        None => out.push_str(&format!("  Next:      {}", "nothing to do".dimmed())),
    }

    out
}

/// Formats the outcome of a run.
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut lines: Vec<String> = summary
        .processed
        .iter()
        .map(|id| format!("{} {}", "✓".green().bold(), id))
        .collect();

    if let Some((id, reason)) = &summary.failed {
        lines.push(format!("{} {} ({})", "✗".red().bold(), id, reason));
    }

    if summary.exhausted && summary.processed.is_empty() && summary.failed.is_none() {
        lines.push("No new items".to_string());
    }

    lines.join("\n")
}
