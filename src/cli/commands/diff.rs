use std::collections::BTreeSet;

use colored::Colorize;

use crate::adapters::state::file_state_store::FileStateStore;
use crate::cli::commands::plan_helpers;
use crate::cli::context;
use crate::cli::output;
use crate::core::errors::Result;
use crate::core::models::diff_result::{DiffEntry, DiffKind, DiffResult, StackChange};
use crate::core::services::diff_service::DiffService;
use crate::core::services::stack_graph::StackGraph;
use crate::core::traits::state_store::StateStore;

/// Execute the `stratus diff` command.
///
/// Synthesizes the target environment in memory and compares it with
/// the recorded deployment state, stack by stack.
pub fn execute(context_pairs: &[String], stacks: &[String]) -> Result<()> {
    let project_dir = context::project_dir();
    let planned = plan_helpers::plan(context_pairs)?;
    let env_name = planned.environment.name.clone();

    let store = FileStateStore::new(planned.config.state_dir(project_dir));
    let state = store.load(&env_name)?;

    // Positional patterns narrow the report; no selection means all
    let selection: Option<BTreeSet<String>> = if stacks.is_empty() {
        None
    } else {
        let graph = StackGraph;
        let names = graph.select(&planned.stacks, stacks, false)?;
        Some(names.into_iter().collect())
    };

    let svc = DiffService;
    let mut result = svc.diff(&planned.stacks, &state);
    if let Some(selected) = &selection {
        result.stacks.retain(|s| selected.contains(&s.name));
    }

    output::header(&format!("stratus diff ('{env_name}')"));

    if result.is_empty() {
        output::success("No differences");
        return Ok(());
    }

    print_diff_table(&result);
    print_diff_summary(&result);

    Ok(())
}

/// Print one row per stack, with property-level rows under updates.
fn print_diff_table(result: &DiffResult) {
    let name_width = result
        .stacks
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(5)
        .max(5);

    let header = format!("  {:<width$}   {}", "Stack", "Change", width = name_width);
    println!("{}", header.bold());
    println!("  {}", "─".repeat(name_width + 12));

    for stack in &result.stacks {
        match stack.change {
            StackChange::Create => {
                println!(
                    "  {:<width$}   {}",
                    stack.name.green(),
                    "create".green(),
                    width = name_width
                );
            }
            StackChange::Destroy => {
                println!(
                    "  {:<width$}   {}",
                    stack.name.red(),
                    "destroy".red(),
                    width = name_width
                );
            }
            StackChange::Update => {
                println!(
                    "  {:<width$}   {}",
                    stack.name.yellow(),
                    "update".yellow(),
                    width = name_width
                );
                if stack.entries.is_empty() {
                    println!("      {}", "(no resource changes)".dimmed());
                }
                for entry in &stack.entries {
                    print_entry(entry);
                }
            }
            StackChange::Unchanged => {
                println!(
                    "  {:<width$}   {}",
                    stack.name,
                    "unchanged".dimmed(),
                    width = name_width
                );
            }
        }
    }
}

/// Print a single property difference, indented under its stack.
fn print_entry(entry: &DiffEntry) {
    match &entry.kind {
        DiffKind::Added => {
            println!("      {} {}", "+".green(), entry.path.green());
        }
        DiffKind::Removed => {
            println!("      {} {}", "-".red(), entry.path.red());
        }
        DiffKind::Modified {
            old_value,
            new_value,
        } => {
            println!(
                "      {} {}: {} → {}",
                "~".yellow(),
                entry.path,
                truncate(old_value, 24).dimmed(),
                truncate(new_value, 24).yellow(),
            );
        }
    }
}

/// Print a summary line below the table.
fn print_diff_summary(result: &DiffResult) {
    let (create, update, destroy) = result.counts();

    let mut parts = Vec::new();
    if create > 0 {
        parts.push(format!("{create} to create"));
    }
    if update > 0 {
        parts.push(format!("{update} to update"));
    }
    if destroy > 0 {
        parts.push(format!("{destroy} to destroy"));
    }

    println!();
    output::success(&parts.join(", "));
}

/// Truncate a string to `max_len` characters, appending "..." if needed.
/// Uses char boundaries to avoid panic on multibyte UTF-8 sequences.
fn truncate(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else {
        let limit = max_len.saturating_sub(3);
        let truncated: String = s.chars().take(limit).collect();
        format!("{truncated}...")
    }
}
