use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compute the SHA256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// The role a stack plays in an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackKind {
    Key,
    Network,
    Cluster,
    Service,
    Client,
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StackKind::Key => "key",
            StackKind::Network => "network",
            StackKind::Cluster => "cluster",
            StackKind::Service => "service",
            StackKind::Client => "client",
        };
        write!(f, "{label}")
    }
}

/// A value another stack can import, published under a globally
/// unique export name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Short key within the stack, e.g. `vpc-id`.
    pub key: String,
    /// Export name: `{stack-name}-{key}`.
    pub export: String,
    pub description: String,
}

/// A synthesized description of one stack: its resources, the values it
/// exports, and the stacks it must wait for.
///
/// Resource properties may contain `${import:EXPORT-NAME}` placeholders;
/// they are substituted with exported output values at deploy time and
/// are the only cross-stack reference mechanism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackTemplate {
    pub name: String,
    pub kind: StackKind,
    pub environment: String,
    /// Logical resource id → description. BTreeMap keeps rendering
    /// deterministic across runs.
    pub resources: BTreeMap<String, Value>,
    pub outputs: Vec<OutputSpec>,
    pub tags: BTreeMap<String, String>,
    pub depends_on: Vec<String>,
}

impl StackTemplate {
    /// The export name a given output key publishes under.
    pub fn export_name(&self, key: &str) -> String {
        format!("{}-{}", self.name, key)
    }

    /// Every export name referenced by an `${import:...}` placeholder
    /// anywhere in this template's resources, sorted and deduplicated.
    pub fn imports(&self) -> Vec<String> {
        let mut found = BTreeSet::new();
        for value in self.resources.values() {
            collect_imports(value, &mut found);
        }
        found.into_iter().collect()
    }

    /// Content hash of the template, used to detect drift between a
    /// synthesized template and the deployed one. Stable across runs
    /// because every container underneath is ordered.
    pub fn template_hash(&self) -> String {
        serde_json::to_vec(self)
            .map(|bytes| sha256_hex(&bytes))
            .unwrap_or_default()
    }
}

/// Walk a JSON value and record the export name of every
/// `${import:...}` placeholder found in its strings.
pub fn collect_imports(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            for name in placeholder_names(s) {
                found.insert(name);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_imports(item, found);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_imports(item, found);
            }
        }
        _ => {}
    }
}

/// Export names referenced by placeholders in a single string, in
/// order of appearance. Unterminated placeholders are ignored.
pub fn placeholder_names(s: &str) -> Vec<String> {
    const OPEN: &str = "${import:";
    let mut names = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        match after.find('}') {
            Some(end) => {
                names.push(after[..end].to_string());
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}

/// Index of everything one synthesis run produced, written alongside
/// the template files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthManifest {
    pub environment: String,
    pub synthesized_at: DateTime<Utc>,
    /// Context values the run was invoked with, as passed on the
    /// command line.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
    /// Stacks in dependency order.
    pub stacks: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub kind: StackKind,
    pub template_hash: String,
    pub depends_on: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_template(resources: BTreeMap<String, Value>) -> StackTemplate {
        StackTemplate {
            name: "demo-network-dev".to_string(),
            kind: StackKind::Network,
            environment: "dev".to_string(),
            resources,
            outputs: vec![OutputSpec {
                key: "vpc-id".to_string(),
                export: "demo-network-dev-vpc-id".to_string(),
                description: "VPC id".to_string(),
            }],
            tags: BTreeMap::new(),
            depends_on: vec![],
        }
    }

    #[test]
    fn export_name_prefixes_stack() {
        let template = make_template(BTreeMap::new());
        assert_eq!(template.export_name("vpc-id"), "demo-network-dev-vpc-id");
    }

    #[test]
    fn placeholder_names_found_in_order() {
        let names = placeholder_names("${import:a-b}/x/${import:c-d}");
        assert_eq!(names, vec!["a-b".to_string(), "c-d".to_string()]);
    }

    #[test]
    fn unterminated_placeholder_ignored() {
        assert!(placeholder_names("${import:never-closed").is_empty());
        assert_eq!(placeholder_names("ok ${import:a} ${import:bad"), vec![
            "a".to_string()
        ]);
    }

    #[test]
    fn imports_walk_nested_values_sorted_deduped() {
        let mut resources = BTreeMap::new();
        resources.insert(
            "service".to_string(),
            json!({
                "cluster": "${import:demo-cluster-dev-cluster-name}",
                "network": {
                    "vpc": "${import:demo-network-dev-vpc-id}",
                    "subnets": ["${import:demo-network-dev-vpc-id}"],
                },
            }),
        );
        let template = make_template(resources);
        assert_eq!(template.imports(), vec![
            "demo-cluster-dev-cluster-name".to_string(),
            "demo-network-dev-vpc-id".to_string(),
        ]);
    }

    #[test]
    fn template_hash_is_stable() {
        let template = make_template(BTreeMap::new());
        assert_eq!(template.template_hash(), template.template_hash());
        assert_eq!(template.template_hash().len(), 64);
    }

    #[test]
    fn template_hash_tracks_content() {
        let base = make_template(BTreeMap::new());
        let mut resources = BTreeMap::new();
        resources.insert("vpc".to_string(), json!({"cidr": "10.0.0.0/16"}));
        let changed = make_template(resources);
        assert_ne!(base.template_hash(), changed.template_hash());
    }

    #[test]
    fn kind_serializes_lowercase() {
        let rendered = serde_json::to_string(&StackKind::Network).unwrap();
        assert_eq!(rendered, "\"network\"");
    }
}
