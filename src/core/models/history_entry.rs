use std::fmt;

use serde::{Deserialize, Serialize};

/// Actions that get recorded in the deployment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Init,
    Synth,
    Deploy,
    Destroy,
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HistoryAction::Init => "init",
            HistoryAction::Synth => "synth",
            HistoryAction::Deploy => "deploy",
            HistoryAction::Destroy => "destroy",
        };
        write!(f, "{label}")
    }
}

/// A single entry in the history log (JSON lines format).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub author: String,
    pub email: Option<String>,
    pub action: HistoryAction,
    pub environment: String,
    pub stacks: Vec<String>,
    pub detail: Option<String>,
}
