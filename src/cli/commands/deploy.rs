use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::adapters::state::file_state_store::FileStateStore;
use crate::cli::ApprovalMode;
use crate::cli::commands::{history_helpers, plan_helpers};
use crate::cli::context;
use crate::cli::output;
use crate::core::errors::{Result, StratusError};
use crate::core::models::diff_result::{DiffResult, StackChange};
use crate::core::models::history_entry::HistoryAction;
use crate::core::services::deployer::{ApplyOutcome, Deployer};
use crate::core::services::diff_service::DiffService;
use crate::core::services::stack_graph::StackGraph;
use crate::core::traits::state_store::StateStore;

/// Execute the `stratus deploy` command.
///
/// Synthesizes in memory, shows what would change, asks for approval
/// unless `--require-approval never`, then applies the selected stacks
/// in dependency order, saving state after each one.
pub fn execute(
    context_pairs: &[String],
    all: bool,
    stacks: &[String],
    require_approval: ApprovalMode,
    quiet: bool,
) -> Result<()> {
    if !all && stacks.is_empty() {
        return Err(StratusError::InvalidConfig {
            detail: "deploy requires a stack selection. \
                     Usage: stratus deploy --all, or stratus deploy <stack>..."
                .to_string(),
        });
    }

    let project_dir = context::project_dir();
    let planned = plan_helpers::plan(context_pairs)?;
    let env_name = planned.environment.name.clone();

    // Expand the selection with everything it depends on, then narrow
    // the planned set down to it in dependency order
    let graph = StackGraph;
    let selected = graph.select(&planned.stacks, stacks, all)?;
    let names = graph.with_dependencies(&planned.stacks, &selected);
    let wanted: BTreeSet<&str> = names.iter().map(String::as_str).collect();
    let subset: Vec<_> = planned
        .stacks
        .iter()
        .filter(|t| wanted.contains(t.name.as_str()))
        .cloned()
        .collect();
    let ordered = graph.order(&subset)?;

    let store = FileStateStore::new(planned.config.state_dir(project_dir));
    let mut state = store.load(&env_name)?;

    let svc = DiffService;
    let mut diff = svc.diff(&subset, &state);
    diff.stacks.retain(|s| wanted.contains(s.name.as_str()));

    if !quiet {
        output::header(&format!("Deploying to '{env_name}'"));
        print_plan(&diff);
    }

    if diff.is_empty() {
        if !quiet {
            println!();
            output::success(&format!(
                "No changes; {} stack(s) already up to date",
                ordered.len()
            ));
        }
        return Ok(());
    }

    if require_approval == ApprovalMode::Always {
        print!("\n  Deploy {} stack(s) to '{env_name}'? [y/N]: ", ordered.len());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        let answer = input.trim().to_lowercase();
        if answer != "y" && answer != "yes" {
            return Err(StratusError::Aborted);
        }
        println!();
    }

    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(ordered.len() as u64)
    };
    if let Ok(style) = ProgressStyle::with_template("  [{bar:30}] {pos}/{len} {msg}") {
        bar.set_style(style.progress_chars("=> "));
    }

    let deployer = Deployer;
    let mut applied = Vec::new();
    let mut skipped = 0usize;

    for template in &ordered {
        bar.set_message(template.name.clone());

        match deployer.apply_stack(&mut state, template) {
            Ok(ApplyOutcome::Deployed) => {
                if let Err(e) = store.save(&state) {
                    bar.finish_and_clear();
                    return Err(e);
                }
                bar.println(format!("  {} {}", "✓".green(), template.name));
                applied.push(template.name.clone());
            }
            Ok(ApplyOutcome::Unchanged) => {
                bar.println(format!(
                    "  {} {} {}",
                    "-".dimmed(),
                    template.name,
                    "(no changes)".dimmed()
                ));
                skipped += 1;
            }
            Err(e) => {
                // Earlier stacks stay deployed; no rollback
                bar.finish_and_clear();
                return Err(e);
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    if !quiet {
        println!();
        output::success(&format!(
            "Deployed {} stack(s) to '{env_name}' ({skipped} unchanged)",
            applied.len()
        ));
    }

    history_helpers::record_history(
        project_dir,
        &planned.config,
        HistoryAction::Deploy,
        &env_name,
        applied.clone(),
        Some(format!("{} applied, {skipped} unchanged", applied.len())),
    );

    Ok(())
}

/// Print a compact plan: one line per stack that would change, then a
/// count of the unchanged ones.
fn print_plan(diff: &DiffResult) {
    let mut unchanged = 0usize;
    for stack in &diff.stacks {
        match stack.change {
            StackChange::Create => {
                println!("  {} {} {}", "+".green(), stack.name, "(create)".green());
            }
            StackChange::Update => {
                println!("  {} {} {}", "~".yellow(), stack.name, "(update)".yellow());
            }
            StackChange::Unchanged => unchanged += 1,
            // Deploy never removes stacks
            StackChange::Destroy => {}
        }
    }
    if unchanged > 0 {
        println!("  {}", format!("{unchanged} unchanged").dimmed());
    }
}
