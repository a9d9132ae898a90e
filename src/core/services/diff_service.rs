use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::core::models::diff_result::{DiffEntry, DiffKind, DiffResult, StackChange, StackDiff};
use crate::core::models::stack::StackTemplate;
use crate::core::models::state::DeploymentState;

/// Compares a fresh synthesis against recorded deployment state.
pub struct DiffService;

impl DiffService {
    /// Classify every stack and collect per-property differences.
    ///
    /// - Stacks only in the synthesis are `Create`
    /// - Stacks only in the state are `Destroy`
    /// - Stacks in both with differing template hashes are `Update`,
    ///   with entries from comparing the flattened resource trees
    /// - Everything else is `Unchanged`
    ///
    /// Planned stacks keep planner order; removed stacks follow, sorted
    /// by name.
    pub fn diff(&self, templates: &[StackTemplate], state: &DeploymentState) -> DiffResult {
        let mut stacks = Vec::new();

        for template in templates {
            match state.stacks.get(&template.name) {
                None => stacks.push(StackDiff {
                    name: template.name.clone(),
                    kind: template.kind,
                    change: StackChange::Create,
                    entries: Vec::new(),
                }),
                Some(deployed) if deployed.template_hash == template.template_hash() => {
                    stacks.push(StackDiff {
                        name: template.name.clone(),
                        kind: template.kind,
                        change: StackChange::Unchanged,
                        entries: Vec::new(),
                    });
                }
                Some(deployed) => stacks.push(StackDiff {
                    name: template.name.clone(),
                    kind: template.kind,
                    change: StackChange::Update,
                    entries: Self::compare(&deployed.resources, &template.resources),
                }),
            }
        }

        let planned: BTreeSet<&str> = templates.iter().map(|t| t.name.as_str()).collect();
        for (name, deployed) in &state.stacks {
            if !planned.contains(name.as_str()) {
                stacks.push(StackDiff {
                    name: name.clone(),
                    kind: deployed.kind,
                    change: StackChange::Destroy,
                    entries: Vec::new(),
                });
            }
        }

        DiffResult {
            environment: state.environment.clone(),
            stacks,
        }
    }

    /// Property-level comparison of two resource trees.
    ///
    /// Trees are flattened to dotted leaf paths
    /// (`service.properties.desired_count`); paths only on the left are
    /// `Removed`, only on the right `Added`, value changes `Modified`.
    /// Results are sorted by path.
    fn compare(old: &BTreeMap<String, Value>, new: &BTreeMap<String, Value>) -> Vec<DiffEntry> {
        let old_flat = flatten_tree(old);
        let new_flat = flatten_tree(new);

        let all_paths: BTreeSet<&String> = old_flat.keys().chain(new_flat.keys()).collect();
        let mut entries = Vec::new();

        for path in all_paths {
            match (old_flat.get(path), new_flat.get(path)) {
                (Some(_), None) => entries.push(DiffEntry {
                    path: path.clone(),
                    kind: DiffKind::Removed,
                }),
                (None, Some(_)) => entries.push(DiffEntry {
                    path: path.clone(),
                    kind: DiffKind::Added,
                }),
                (Some(old_value), Some(new_value)) if old_value != new_value => {
                    entries.push(DiffEntry {
                        path: path.clone(),
                        kind: DiffKind::Modified {
                            old_value: old_value.clone(),
                            new_value: new_value.clone(),
                        },
                    });
                }
                _ => {}
            }
        }
        entries
    }
}

fn flatten_tree(resources: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    let mut flat = BTreeMap::new();
    for (name, value) in resources {
        flatten_value(name, value, &mut flat);
    }
    flat
}

fn flatten_value(path: &str, value: &Value, flat: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_value(&format!("{path}.{key}"), child, flat);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_value(&format!("{path}.{index}"), child, flat);
            }
        }
        Value::String(s) => {
            flat.insert(path.to_string(), s.clone());
        }
        other => {
            flat.insert(path.to_string(), other.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::stack::StackKind;
    use crate::core::models::state::StackState;
    use chrono::Utc;
    use serde_json::json;

    /// Helper: a template with one resource holding the given cpu.
    fn make_template(name: &str, cpu: u32) -> StackTemplate {
        let mut resources = BTreeMap::new();
        resources.insert(
            "service".to_string(),
            json!({"properties": {"cpu": cpu, "port": 8001}}),
        );
        StackTemplate {
            name: name.to_string(),
            kind: StackKind::Service,
            environment: "dev".to_string(),
            resources,
            outputs: vec![],
            tags: BTreeMap::new(),
            depends_on: vec![],
        }
    }

    /// Helper: state recording the given template as deployed.
    fn deployed(templates: &[StackTemplate]) -> DeploymentState {
        let mut state = DeploymentState::new("dev");
        for template in templates {
            state.stacks.insert(
                template.name.clone(),
                StackState {
                    kind: template.kind,
                    template_hash: template.template_hash(),
                    resources: template.resources.clone(),
                    deployed_at: Utc::now(),
                    outputs: BTreeMap::new(),
                },
            );
        }
        state
    }

    #[test]
    fn fresh_project_creates_everything() {
        let templates = vec![make_template("a", 512), make_template("b", 512)];
        let state = DeploymentState::new("dev");

        let result = DiffService.diff(&templates, &state);

        assert!(!result.is_empty());
        assert_eq!(result.counts(), (2, 0, 0));
    }

    #[test]
    fn unchanged_deployment_is_empty_diff() {
        let templates = vec![make_template("a", 512)];
        let state = deployed(&templates);

        let result = DiffService.diff(&templates, &state);

        assert!(result.is_empty());
        assert_eq!(result.stacks[0].change, StackChange::Unchanged);
    }

    #[test]
    fn changed_template_is_update_with_entries() {
        let state = deployed(&[make_template("a", 512)]);
        let templates = vec![make_template("a", 1024)];

        let result = DiffService.diff(&templates, &state);

        assert_eq!(result.counts(), (0, 1, 0));
        let entries = &result.stacks[0].entries;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "service.properties.cpu");
        assert_eq!(entries[0].kind, DiffKind::Modified {
            old_value: "512".to_string(),
            new_value: "1024".to_string(),
        });
    }

    #[test]
    fn removed_stack_is_destroy() {
        let state = deployed(&[make_template("a", 512), make_template("b", 512)]);
        let templates = vec![make_template("a", 512)];

        let result = DiffService.diff(&templates, &state);

        assert_eq!(result.counts(), (0, 0, 1));
        let destroyed: Vec<&str> = result
            .stacks
            .iter()
            .filter(|s| s.change == StackChange::Destroy)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(destroyed, vec!["b"]);
    }

    #[test]
    fn added_and_removed_paths_classified() {
        let mut old_resources = BTreeMap::new();
        old_resources.insert("svc".to_string(), json!({"only_old": 1, "shared": "x"}));
        let mut new_resources = BTreeMap::new();
        new_resources.insert("svc".to_string(), json!({"only_new": 2, "shared": "x"}));

        let entries = DiffService::compare(&old_resources, &new_resources);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "svc.only_new");
        assert_eq!(entries[0].kind, DiffKind::Added);
        assert_eq!(entries[1].path, "svc.only_old");
        assert_eq!(entries[1].kind, DiffKind::Removed);
    }

    #[test]
    fn array_elements_flatten_by_index() {
        let mut old_resources = BTreeMap::new();
        old_resources.insert("lb".to_string(), json!({"listeners": [{"port": 80}]}));
        let mut new_resources = BTreeMap::new();
        new_resources.insert(
            "lb".to_string(),
            json!({"listeners": [{"port": 80}, {"port": 443}]}),
        );

        let entries = DiffService::compare(&old_resources, &new_resources);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "lb.listeners.1.port");
        assert_eq!(entries[0].kind, DiffKind::Added);
    }
}
