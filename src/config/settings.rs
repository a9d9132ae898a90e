use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::core::errors::{Result, StratusError};

/// The raw layered settings document (`settings.yaml`).
///
/// One top-level key per layer: `default` plus one key per environment.
/// Each layer holds a configuration tree; resolution merges an
/// environment's tree over the default tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsDoc {
    root: Mapping,
}

impl SettingsDoc {
    /// Load and parse the settings document at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StratusError::SettingsNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse document content, checking the layer shape: the top level
    /// must be a mapping of string keys, each holding a mapping or null.
    pub fn parse(content: &str) -> Result<Self> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|e| StratusError::InvalidSettings {
                detail: format!("not valid YAML: {e}"),
            })?;

        let root = match value {
            Value::Mapping(root) => root,
            Value::Null => {
                return Err(StratusError::InvalidSettings {
                    detail: "document is empty".into(),
                });
            }
            other => {
                return Err(StratusError::InvalidSettings {
                    detail: format!(
                        "top level must be a mapping of environment names, got {}",
                        type_name(&other)
                    ),
                });
            }
        };

        for (key, body) in &root {
            let Some(name) = key.as_str() else {
                return Err(StratusError::InvalidSettings {
                    detail: format!("top-level keys must be strings, got {}", type_name(key)),
                });
            };
            if !matches!(body, Value::Mapping(_) | Value::Null) {
                return Err(StratusError::InvalidSettings {
                    detail: format!(
                        "'{name}' must hold a mapping of settings, got {}",
                        type_name(body)
                    ),
                });
            }
        }

        Ok(Self { root })
    }

    /// Environment names defined in the document, sorted. The `default`
    /// layer is a baseline, not an environment, and is excluded.
    pub fn environments(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .root
            .iter()
            .filter_map(|(key, _)| key.as_str())
            .filter(|name| *name != "default")
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    /// The tree under one top-level key. A null body counts as an empty
    /// tree; a missing key returns `None`.
    pub fn layer(&self, name: &str) -> Option<Mapping> {
        match self.root.get(name)? {
            Value::Mapping(tree) => Some(tree.clone()),
            Value::Null => Some(Mapping::new()),
            _ => None,
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
