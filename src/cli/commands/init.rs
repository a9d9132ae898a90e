use std::io::Write;
use std::path::Path;

use crate::cli::commands::history_helpers;
use crate::cli::context;
use crate::cli::output;
use crate::core::errors::{Result, StratusError};
use crate::core::models::env_config::is_valid_name;

/// Execute the `stratus init` command.
///
/// Scaffolds a project manifest, a commented settings document with a
/// default layer and two environments, and the local `.stratus/` data
/// directory.
pub fn execute(verbose: bool) -> Result<()> {
    let project_dir = context::project_dir();

    if project_dir.join("stratus.toml").exists() {
        return Err(StratusError::InvalidConfig {
            detail: "Stratus is already initialized in this project (stratus.toml exists)".into(),
        });
    }

    output::header("Stratus — Initializing project");

    std::fs::create_dir_all(project_dir.join(".stratus"))?;
    output::success("Created .stratus/");

    let name = derive_project_name(project_dir);
    let manifest = format!(
        r#"[project]
name = "{name}"
format_version = 1
settings = "settings.yaml"
output = "stratus.out"
default_environment = "dev"

[history]
enabled = true
log_file = "history.log"
"#
    );
    std::fs::write(project_dir.join("stratus.toml"), manifest)?;
    output::success(&format!("Generated stratus.toml (project '{name}')"));

    let settings = r#"# Stratus settings document.
#
# The 'default' layer applies to every environment. Each other
# top-level key is an environment whose values override the defaults:
# nested mappings merge key by key, everything else replaces the
# inherited value, and a null leaves it untouched.

default:
  vpc:
    cidr: 10.0.0.0/16
    max_azs: 2
    nat_gateways: 1
  ecs:
    cpu: 512
    memory_limit_mib: 1024
    desired_count: 1
  lambda:
    memory_size: 256
    timeout_seconds: 30
  load_balancer:
    idle_timeout_seconds: 60
    enable_https_in_dev: false
  services:
    url-fetcher:
      port: 8001
    random-web:
      port: 8003

# Development runs with the defaults as-is.
dev:

prod:
  ecs:
    desired_count: 2
  lambda:
    memory_size: 512
"#;
    std::fs::write(project_dir.join("settings.yaml"), settings)?;
    output::success("Generated settings.yaml with sample environments");

    add_to_gitignore(project_dir, "stratus.out/")?;

    history_helpers::record_history_init(project_dir);

    output::success("Project ready.\n");
    print_next_steps(verbose);

    Ok(())
}

/// Derive the project name from the directory name, keeping only
/// characters the stack naming scheme accepts.
fn derive_project_name(project_dir: &Path) -> String {
    let raw = project_dir
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();

    let sanitized: String = raw
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let name = sanitized.trim_matches('-').to_string();

    if is_valid_name(&name) {
        name
    } else {
        "stratus-app".to_string()
    }
}

/// Add an entry to .gitignore if not already present.
fn add_to_gitignore(project_dir: &Path, entry: &str) -> Result<()> {
    let gitignore = project_dir.join(".gitignore");

    if gitignore.exists() {
        let content = std::fs::read_to_string(&gitignore)?;
        if content.lines().any(|l| l.trim() == entry) {
            output::success(&format!("{entry} already in .gitignore"));
            return Ok(());
        }
        let mut file = std::fs::OpenOptions::new().append(true).open(&gitignore)?;
        writeln!(file, "\n# Stratus: synthesized templates\n{entry}")?;
    } else {
        std::fs::write(
            &gitignore,
            format!("# Stratus: synthesized templates\n{entry}\n"),
        )?;
    }

    output::success(&format!("Added {entry} to .gitignore"));
    Ok(())
}

/// Print next steps after init.
fn print_next_steps(verbose: bool) {
    println!("  Next steps:");
    println!("     1. Edit settings.yaml with your services");
    println!("     2. Run 'stratus synth' to inspect the templates");
    println!("     3. Run 'stratus deploy --all' when they look right");

    if verbose {
        println!();
        println!("  Files created:");
        println!("     stratus.toml    — project manifest");
        println!("     settings.yaml   — layered environment settings");
        println!("     .stratus/       — deployment state and history");
    }
}
