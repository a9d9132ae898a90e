use chrono::{NaiveDate, TimeZone, Utc};
use colored::Colorize;

use crate::adapters::history::json_history_log::JsonHistoryLog;
use crate::cli::commands::plan_helpers;
use crate::cli::context;
use crate::cli::output;
use crate::config::project::ProjectConfig;
use crate::core::errors::{Result, StratusError};
use crate::core::models::history_entry::{HistoryAction, HistoryEntry};
use crate::core::traits::history::HistoryLog;

/// Execute the `stratus log` command.
///
/// Displays the deployment history with optional filters for author,
/// date, and entry count. `--context environment=<name>` narrows the
/// log to one environment.
pub fn execute(
    context_pairs: &[String],
    author: Option<&str>,
    since: Option<&str>,
    last: Option<usize>,
) -> Result<()> {
    let project_dir = context::project_dir();
    let config = ProjectConfig::load(project_dir)?;

    let log = JsonHistoryLog::new(&config.history_path(project_dir));

    // Only narrow by environment when one was asked for explicitly
    let environment = plan_helpers::context_value(context_pairs, "environment");
    let since_dt = since.map(parse_since).transpose()?;

    let mut entries = log.query(environment, since_dt)?;
    if let Some(author) = author {
        entries.retain(|e| e.author == author);
    }

    if entries.is_empty() {
        output::header("stratus log");
        output::warning("No history entries found");
        if author.is_some() || since.is_some() || environment.is_some() {
            println!("  Try removing filters to see all entries.");
        }
        return Ok(());
    }

    // Apply --last N (take from the end)
    let display: Vec<&HistoryEntry> = match last {
        Some(n) => entries
            .iter()
            .rev()
            .take(n)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect(),
        None => entries.iter().collect(),
    };

    output::header(&format!("stratus log ({} entries)", display.len()));
    println!();

    for entry in &display {
        print_entry(entry);
    }

    Ok(())
}

/// Parse a date string (ISO 8601: `YYYY-MM-DD`) into a UTC DateTime.
fn parse_since(s: &str) -> Result<chrono::DateTime<Utc>> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| StratusError::InvalidConfig {
            detail: format!(
                "Invalid date format: '{s}'. Expected ISO 8601 (YYYY-MM-DD), e.g. 2026-01-15"
            ),
        })
        .map(|d| Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).expect("midnight is always valid")))
}

/// Print a single history entry as a formatted row.
fn print_entry(entry: &HistoryEntry) {
    let date = entry.timestamp.format("%Y-%m-%d %H:%M:%S");
    let action = format_action(&entry.action);
    let stacks = if entry.stacks.is_empty() {
        "—".dimmed().to_string()
    } else {
        entry.stacks.join(", ")
    };
    let detail = entry.detail.as_deref().unwrap_or("").dimmed().to_string();

    println!(
        "  {} {} {:<8} {:<8} {} {}",
        date.to_string().dimmed(),
        "│".dimmed(),
        action,
        entry.environment,
        stacks,
        detail,
    );
}

/// Format a HistoryAction as a colored string.
fn format_action(action: &HistoryAction) -> String {
    match action {
        HistoryAction::Init => "init".cyan().to_string(),
        HistoryAction::Synth => "synth".blue().to_string(),
        HistoryAction::Deploy => "deploy".green().to_string(),
        HistoryAction::Destroy => "destroy".red().to_string(),
    }
}
