use std::path::Path;

use colored::Colorize;

use crate::adapters::history::json_history_log::JsonHistoryLog;
use crate::adapters::state::file_state_store::FileStateStore;
use crate::cli::context;
use crate::cli::output;
use crate::config::project::ProjectConfig;
use crate::config::settings::SettingsDoc;
use crate::core::errors::Result;
use crate::core::services::settings_resolver::SettingsResolver;
use crate::core::services::stack_planner::StackPlanner;
use crate::core::traits::history::HistoryLog;
use crate::core::traits::state_store::StateStore;

/// Execute the `stratus status` command.
///
/// Displays a full overview of the project: manifest summary, the
/// environments the settings document defines, per-environment
/// deployed state, and the history tail.
pub fn execute() -> Result<()> {
    let project_dir = context::project_dir();
    let config = ProjectConfig::load(project_dir)?;

    output::header(&format!("Stratus v{}", env!("CARGO_PKG_VERSION")));
    println!("  Project: {}", config.project.name.cyan());
    println!("  Settings: {}", config.project.settings);
    println!("  Output: {}", config.project.output);
    match &config.project.default_environment {
        Some(env) => println!("  Default environment: {}", env.cyan()),
        None => println!(
            "  Default environment: {}",
            "(none, falls back to dev)".dimmed()
        ),
    }

    print_environments(project_dir, &config);
    print_state(project_dir, &config);
    print_history(project_dir, &config);

    Ok(())
}

/// Print each environment the settings document defines, with the
/// number of stacks it would synthesize.
fn print_environments(project_dir: &Path, config: &ProjectConfig) {
    println!("\n{}", "  Environments".bold());

    let doc = match SettingsDoc::load(&config.settings_path(project_dir)) {
        Ok(doc) => doc,
        Err(e) => {
            output::warning(&format!("Could not read settings: {e}"));
            return;
        }
    };

    let names = doc.environments();
    if names.is_empty() {
        output::warning("No environments defined in the settings document");
        return;
    }

    let resolver = SettingsResolver;
    for name in &names {
        match resolver.resolve(&doc, name) {
            Ok(environment) => {
                let planner = StackPlanner::new(&config.project.name, &environment);
                let count = planner.plan().len();
                let marker = if Some(name.as_str()) == config.project.default_environment.as_deref()
                {
                    " (default)"
                } else {
                    ""
                };
                println!(
                    "  {} {:<12} {}{}",
                    "✓".green(),
                    name,
                    format!("{count} stacks").dimmed(),
                    marker.dimmed(),
                );
            }
            Err(_) => {
                println!(
                    "  {} {:<12} {}",
                    "✗".red(),
                    name,
                    "(does not resolve, run 'stratus synth' for details)".red(),
                );
            }
        }
    }
}

/// Print the deployed state summary per environment.
fn print_state(project_dir: &Path, config: &ProjectConfig) {
    println!("\n{}", "  Deployed state".bold());

    let store = FileStateStore::new(config.state_dir(project_dir));
    let envs = match store.environments() {
        Ok(envs) => envs,
        Err(e) => {
            output::warning(&format!("Could not read state directory: {e}"));
            return;
        }
    };

    if envs.is_empty() {
        println!("  {}", "Nothing deployed yet".dimmed());
        return;
    }

    for env in &envs {
        match store.load(env) {
            Ok(state) => {
                println!(
                    "  {} {:<12} {} stack(s), updated {}",
                    "✓".green(),
                    env,
                    state.stacks.len(),
                    state
                        .updated_at
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string()
                        .dimmed(),
                );
            }
            Err(_) => {
                println!(
                    "  {} {:<12} {}",
                    "✗".red(),
                    env,
                    "(unreadable state file)".red(),
                );
            }
        }
    }
}

/// Print the last few history entries.
fn print_history(project_dir: &Path, config: &ProjectConfig) {
    if !config.history_enabled() {
        println!("\n{}", "  History: disabled".dimmed());
        return;
    }

    let log_path = config.history_path(project_dir);
    if !log_path.exists() {
        println!("\n  {} History: no entries yet", "—".dimmed());
        return;
    }

    let log = JsonHistoryLog::new(&log_path);
    match log.query(None, None) {
        Ok(entries) if entries.is_empty() => {
            println!("\n  {} History: no entries yet", "—".dimmed());
        }
        Ok(entries) => {
            println!(
                "\n{}",
                format!("  History ({} entries)", entries.len()).bold()
            );
            let tail: Vec<_> = entries.iter().rev().take(3).collect();
            for entry in tail.into_iter().rev() {
                println!(
                    "  {} {} {:<8} {}",
                    entry
                        .timestamp
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string()
                        .dimmed(),
                    "│".dimmed(),
                    entry.action.to_string(),
                    entry.environment.dimmed(),
                );
            }
        }
        Err(e) => {
            output::warning(&format!("Could not read history: {e}"));
        }
    }
}
