use serde_yaml::{Mapping, Value};

use crate::config::settings::SettingsDoc;
use crate::core::errors::{Result, StratusError};
use crate::core::models::env_config::EnvironmentConfig;
use crate::core::models::environment::ResolvedEnvironment;

/// Resolves an environment's settings (default layer + overrides).
///
/// Given the layered settings document, merges the named environment's
/// tree over the `default` tree key by key, recursively, and produces
/// the typed configuration that parameterizes stack synthesis.
pub struct SettingsResolver;

impl SettingsResolver {
    /// Resolve and validate the configuration for `name`.
    ///
    /// # Errors
    ///
    /// - `EnvironmentNotFound` if `name` has no top-level key in the
    ///   document. Listing `default` here is deliberate only in the
    ///   negative: `default` resolves to itself but is never offered
    ///   as an environment.
    /// - `InvalidConfig` if the merged tree does not type-check or
    ///   fails validation.
    pub fn resolve(&self, doc: &SettingsDoc, name: &str) -> Result<ResolvedEnvironment> {
        let available = doc.environments();
        if name != "default" && !available.iter().any(|env| env == name) {
            let listed = if available.is_empty() {
                "(none)".to_string()
            } else {
                available.join(", ")
            };
            return Err(StratusError::EnvironmentNotFound {
                name: name.to_string(),
                available: listed,
            });
        }

        // A document without a default layer still resolves; the
        // environment tree then stands alone.
        let mut merged = doc.layer("default").unwrap_or_default();
        if name != "default"
            && let Some(overlay) = doc.layer(name)
        {
            Self::merge(&mut merged, &overlay);
        }

        let config: EnvironmentConfig =
            serde_yaml::from_value(Value::Mapping(merged.clone())).map_err(|e| {
                StratusError::InvalidConfig {
                    detail: format!("environment '{name}': {e}"),
                }
            })?;
        config.validate()?;

        Ok(ResolvedEnvironment {
            name: name.to_string(),
            tree: merged,
            config,
        })
    }

    /// Merge `overlay` onto `base`, recursively.
    ///
    /// 1. Two mappings at the same key merge key by key.
    /// 2. Anything else (scalar, sequence, or mixed shapes) is replaced
    ///    wholesale by the overlay value.
    /// 3. An explicit null in the overlay keeps the base value.
    ///
    /// Base keys keep their positions; overlay-only keys append in
    /// overlay order. Merging the same overlay twice is a no-op.
    fn merge(base: &mut Mapping, overlay: &Mapping) {
        for (key, value) in overlay {
            if value.is_null() {
                continue;
            }
            if let Some(Value::Mapping(base_child)) = base.get_mut(key)
                && let Value::Mapping(overlay_child) = value
            {
                Self::merge(base_child, overlay_child);
            } else {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}
