use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::adapters::state::file_state_store::FileStateStore;
use crate::cli::commands::{history_helpers, plan_helpers};
use crate::cli::context;
use crate::cli::output;
use crate::core::errors::{Result, StratusError};
use crate::core::models::history_entry::HistoryAction;
use crate::core::services::deployer::Deployer;
use crate::core::services::stack_graph::StackGraph;
use crate::core::traits::state_store::StateStore;

/// Execute the `stratus destroy` command.
///
/// Removes the selected stacks from the deployment state in reverse
/// dependency order, taking their dependents down with them.
pub fn execute(context_pairs: &[String], all: bool, stacks: &[String], force: bool) -> Result<()> {
    if !all && stacks.is_empty() {
        return Err(StratusError::InvalidConfig {
            detail: "destroy requires a stack selection. \
                     Usage: stratus destroy --all, or stratus destroy <stack>..."
                .to_string(),
        });
    }

    let project_dir = context::project_dir();
    let planned = plan_helpers::plan(context_pairs)?;
    let env_name = planned.environment.name.clone();

    let store = FileStateStore::new(planned.config.state_dir(project_dir));
    let mut state = store.load(&env_name)?;
    if state.stacks.is_empty() {
        output::warning(&format!("Nothing deployed in '{env_name}'"));
        return Ok(());
    }

    // A stack cannot outlive something it imports from, so the
    // selection grows with its dependents and comes down in reverse
    // dependency order
    let graph = StackGraph;
    let selected = graph.select(&planned.stacks, stacks, all)?;
    let names = graph.with_dependents(&planned.stacks, &selected);
    let wanted: BTreeSet<&str> = names.iter().map(String::as_str).collect();
    let subset: Vec<_> = planned
        .stacks
        .iter()
        .filter(|t| wanted.contains(t.name.as_str()))
        .cloned()
        .collect();
    let mut ordered = graph.order(&subset)?;
    ordered.reverse();

    let present: Vec<&str> = ordered
        .iter()
        .map(|t| t.name.as_str())
        .filter(|name| state.stacks.contains_key(*name))
        .collect();
    if present.is_empty() {
        output::warning(&format!(
            "None of the selected stacks are deployed in '{env_name}'"
        ));
        return Ok(());
    }

    output::header(&format!("Destroying in '{env_name}'"));
    for name in &present {
        println!("  {} {}", "-".red(), name.red());
    }

    if !force {
        print!("\n  Destroy {} stack(s) from '{env_name}'? [y/N]: ", present.len());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        let answer = input.trim().to_lowercase();
        if answer != "y" && answer != "yes" {
            return Err(StratusError::Aborted);
        }
    }
    println!();

    let deployer = Deployer;
    let mut removed = Vec::new();
    for name in &present {
        if deployer.remove_stack(&mut state, name) {
            store.save(&state)?;
            output::success(&format!("{name} destroyed"));
            removed.push(name.to_string());
        }
    }

    println!();
    output::success(&format!(
        "Destroyed {} stack(s) from '{env_name}'",
        removed.len()
    ));

    history_helpers::record_history(
        project_dir,
        &planned.config,
        HistoryAction::Destroy,
        &env_name,
        removed,
        None,
    );

    Ok(())
}
