use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::stack::StackKind;

/// What one deployed stack looked like the last time `deploy` ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackState {
    pub kind: StackKind,
    /// Hash of the template as deployed, compared against fresh
    /// synthesis output by `diff`.
    pub template_hash: String,
    /// The resource tree as synthesized, imports unresolved, so diffs
    /// compare template against template.
    pub resources: BTreeMap<String, Value>,
    pub deployed_at: DateTime<Utc>,
    /// Export name → exported value.
    pub outputs: BTreeMap<String, String>,
}

/// Recorded deployment state for one environment, persisted under
/// `.stratus/state/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentState {
    pub environment: String,
    pub updated_at: DateTime<Utc>,
    /// Stack name → its deployed state.
    pub stacks: BTreeMap<String, StackState>,
}

impl DeploymentState {
    pub fn new(environment: &str) -> Self {
        Self {
            environment: environment.to_string(),
            updated_at: Utc::now(),
            stacks: BTreeMap::new(),
        }
    }

    /// All exported values across every deployed stack. Export names are
    /// stack-prefixed, so entries never collide.
    pub fn exports(&self) -> BTreeMap<String, String> {
        let mut all = BTreeMap::new();
        for stack in self.stacks.values() {
            for (export, value) in &stack.outputs {
                all.insert(export.clone(), value.clone());
            }
        }
        all
    }
}
