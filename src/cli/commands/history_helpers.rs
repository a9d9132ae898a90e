use std::path::Path;
use std::process::Command;

use chrono::Utc;

use crate::adapters::history::json_history_log::JsonHistoryLog;
use crate::cli::output;
use crate::config::project::ProjectConfig;
use crate::core::models::history_entry::{HistoryAction, HistoryEntry};
use crate::core::traits::history::HistoryLog;

/// Read the git user name and email from the local/global config.
/// Returns `("unknown", None)` if git is not available.
pub fn git_author() -> (String, Option<String>) {
    let name = Command::new("git")
        .args(["config", "user.name"])
        .output()
        .ok()
        .and_then(|o| {
            if o.status.success() {
                Some(String::from_utf8_lossy(&o.stdout).trim().to_string())
            } else {
                None
            }
        })
        .unwrap_or_else(|| "unknown".to_string());

    let email = Command::new("git")
        .args(["config", "user.email"])
        .output()
        .ok()
        .and_then(|o| {
            if o.status.success() {
                let val = String::from_utf8_lossy(&o.stdout).trim().to_string();
                if val.is_empty() { None } else { Some(val) }
            } else {
                None
            }
        });

    (name, email)
}

/// Record a deployment history event. Warns on failure instead of
/// propagating the error, since history should not block the main
/// operation.
pub fn record_history(
    project_dir: &Path,
    config: &ProjectConfig,
    action: HistoryAction,
    environment: &str,
    stacks: Vec<String>,
    detail: Option<String>,
) {
    if !config.history_enabled() {
        return;
    }

    let log = JsonHistoryLog::new(&config.history_path(project_dir));
    let (author, email) = git_author();

    let entry = HistoryEntry {
        timestamp: Utc::now(),
        author,
        email,
        action,
        environment: environment.to_string(),
        stacks,
        detail,
    };

    if let Err(e) = log.record(&entry) {
        output::warning(&format!("Could not write history log: {e}"));
    }
}

/// Record a history event right after `stratus init`, before the
/// manifest exists. Uses the default log file path.
pub fn record_history_init(project_dir: &Path) {
    let log = JsonHistoryLog::new(&project_dir.join(".stratus").join("history.log"));
    let (author, email) = git_author();

    let entry = HistoryEntry {
        timestamp: Utc::now(),
        author,
        email,
        action: HistoryAction::Init,
        environment: "default".to_string(),
        stacks: vec![],
        detail: Some("project initialized".to_string()),
    };

    if let Err(e) = log.record(&entry) {
        output::warning(&format!("Could not write history log: {e}"));
    }
}
