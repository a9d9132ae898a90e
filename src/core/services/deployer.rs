use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;

use crate::core::errors::{Result, StratusError};
use crate::core::models::stack::{StackTemplate, sha256_hex};
use crate::core::models::state::{DeploymentState, StackState};

/// What applying one stack did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Deployed,
    /// Template hash matches the recorded deployment; nothing to do.
    Unchanged,
}

/// Applies synthesized stacks to the deployment state.
///
/// Deployment is modeled locally: applying a stack resolves its
/// `${import:...}` placeholders against the current export map,
/// computes the stack's outputs deterministically, and records the
/// result. The provisioning backend stays opaque.
pub struct Deployer;

impl Deployer {
    /// Apply one stack. Callers apply in dependency order and persist
    /// the state after every call, so a failure leaves earlier stacks
    /// deployed and recorded.
    ///
    /// # Errors
    ///
    /// `MissingExport` if a placeholder references an export that
    /// neither the recorded state nor an earlier apply produced.
    pub fn apply_stack(
        &self,
        state: &mut DeploymentState,
        template: &StackTemplate,
    ) -> Result<ApplyOutcome> {
        let hash = template.template_hash();
        if let Some(deployed) = state.stacks.get(&template.name)
            && deployed.template_hash == hash
        {
            return Ok(ApplyOutcome::Unchanged);
        }

        let exports = state.exports();
        let mut resolved = BTreeMap::new();
        for (name, value) in &template.resources {
            resolved.insert(
                name.clone(),
                resolve_value(value, &exports, &template.name)?,
            );
        }

        let outputs = Self::compute_outputs(template, &resolved);
        state.stacks.insert(
            template.name.clone(),
            StackState {
                kind: template.kind,
                template_hash: hash,
                resources: template.resources.clone(),
                deployed_at: Utc::now(),
                outputs,
            },
        );
        state.updated_at = Utc::now();
        Ok(ApplyOutcome::Deployed)
    }

    /// Drop one stack from the state. Returns false if it was not
    /// deployed.
    pub fn remove_stack(&self, state: &mut DeploymentState, name: &str) -> bool {
        let removed = state.stacks.remove(name).is_some();
        if removed {
            state.updated_at = Utc::now();
        }
        removed
    }

    /// Deterministic outputs for a resolved stack.
    ///
    /// Physical ids hash the export name, so values are stable across
    /// runs and machines; names and URLs follow the resource
    /// properties.
    fn compute_outputs(
        template: &StackTemplate,
        resolved: &BTreeMap<String, Value>,
    ) -> BTreeMap<String, String> {
        let env = template.environment.as_str();
        let mut outputs = BTreeMap::new();

        for spec in &template.outputs {
            let value = match spec.key.as_str() {
                "encryption-key-arn" => {
                    let id = short_id(&template.export_name("encryption-key-id"));
                    format!("arn:stratus:{env}:key/key-{id}")
                }
                "encryption-key-id" => format!("key-{}", short_id(&spec.export)),
                "vpc-id" => format!("vpc-{}", short_id(&spec.export)),
                "cluster-name" => resolved_string(resolved, "cluster", "name")
                    .unwrap_or_else(|| template.name.clone()),
                "cluster-arn" => {
                    let name = resolved_string(resolved, "cluster", "name")
                        .unwrap_or_else(|| template.name.clone());
                    format!("arn:stratus:{env}:cluster/{name}")
                }
                "service-name" => template.name.clone(),
                "lb-dns" => lb_dns(template),
                "service-url" => {
                    let https = resolved
                        .get("load-balancer")
                        .and_then(|lb| lb["properties"]["https"].as_bool())
                        .unwrap_or(false);
                    let scheme = if https { "https" } else { "http" };
                    format!("{scheme}://{}", lb_dns(template))
                }
                "function-name" => resolved_string(resolved, "function", "name")
                    .unwrap_or_else(|| template.name.clone()),
                "function-arn" => {
                    let name = resolved_string(resolved, "function", "name")
                        .unwrap_or_else(|| template.name.clone());
                    format!("arn:stratus:{env}:function/{name}")
                }
                "dlq-url" => format!(
                    "https://queue.stratus.local/{}/{}-dlq",
                    short_id(&spec.export),
                    template.name
                ),
                key if key.ends_with("-subnet-ids") => {
                    let azs = resolved
                        .get("vpc")
                        .and_then(|vpc| vpc["properties"]["max_azs"].as_u64())
                        .unwrap_or(2);
                    let ids: Vec<String> = (0..azs)
                        .map(|az| format!("subnet-{}", short_id(&format!("{}-{az}", spec.export))))
                        .collect();
                    ids.join(",")
                }
                key if key.ends_with("-sg-id") => format!("sg-{}", short_id(&spec.export)),
                _ => format!("{}-{}", spec.key, short_id(&spec.export)),
            };
            outputs.insert(spec.export.clone(), value);
        }
        outputs
    }
}

/// First 12 hex chars of the export name's digest.
fn short_id(export: &str) -> String {
    sha256_hex(export.as_bytes())[..12].to_string()
}

fn lb_dns(template: &StackTemplate) -> String {
    let id = short_id(&template.export_name("lb-dns"));
    format!("{}-{}.elb.stratus.local", template.name, &id[..8])
}

fn resolved_string(
    resolved: &BTreeMap<String, Value>,
    resource: &str,
    property: &str,
) -> Option<String> {
    resolved
        .get(resource)?["properties"][property]
        .as_str()
        .map(str::to_string)
}

/// Clone a value with every `${import:...}` placeholder replaced by
/// its exported value.
fn resolve_value(
    value: &Value,
    exports: &BTreeMap<String, String>,
    stack: &str,
) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute(s, exports, stack)?)),
        Value::Array(items) => {
            let resolved: Result<Vec<Value>> = items
                .iter()
                .map(|item| resolve_value(item, exports, stack))
                .collect();
            Ok(Value::Array(resolved?))
        }
        Value::Object(map) => {
            let mut resolved = serde_json::Map::with_capacity(map.len());
            for (key, child) in map {
                resolved.insert(key.clone(), resolve_value(child, exports, stack)?);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

fn substitute(s: &str, exports: &BTreeMap<String, String>, stack: &str) -> Result<String> {
    const OPEN: &str = "${import:";
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match exports.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(StratusError::MissingExport {
                            stack: stack.to_string(),
                            export: name.to_string(),
                        });
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                // unterminated placeholder passes through untouched
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::SettingsDoc;
    use crate::core::services::settings_resolver::SettingsResolver;
    use crate::core::services::stack_graph::StackGraph;
    use crate::core::services::stack_planner::StackPlanner;

    const DOC: &str = "\
default:
  services:
    url-fetcher:
      port: 8001
prod:
  ecs:
    desired_count: 2
dev:
";

    /// Helper: plan and order the full stack set for an environment.
    fn make_plan(env_name: &str) -> Vec<StackTemplate> {
        let doc = SettingsDoc::parse(DOC).unwrap();
        let env = SettingsResolver.resolve(&doc, env_name).unwrap();
        let templates = StackPlanner::new("demo", &env).plan();
        let ordered = StackGraph.order(&templates).unwrap();
        ordered.into_iter().cloned().collect()
    }

    /// Helper: apply a whole plan onto fresh state.
    fn deploy_all(env_name: &str) -> DeploymentState {
        let mut state = DeploymentState::new(env_name);
        for template in &make_plan(env_name) {
            Deployer.apply_stack(&mut state, template).unwrap();
        }
        state
    }

    #[test]
    fn full_deploy_records_every_stack() {
        let state = deploy_all("dev");

        assert_eq!(state.stacks.len(), 5);
        assert!(state.stacks.contains_key("demo-network-dev"));
        assert!(state.stacks.contains_key("demo-client-dev"));
    }

    #[test]
    fn outputs_are_deterministic() {
        let first = deploy_all("dev");
        let second = deploy_all("dev");

        assert_eq!(first.exports(), second.exports());
    }

    #[test]
    fn vpc_id_has_physical_prefix() {
        let state = deploy_all("dev");
        let exports = state.exports();

        let vpc = &exports["demo-network-dev-vpc-id"];
        assert!(vpc.starts_with("vpc-"));
        assert_eq!(vpc.len(), 4 + 12);
    }

    #[test]
    fn subnet_count_follows_max_azs() {
        let state = deploy_all("dev");
        let exports = state.exports();

        let subnets = &exports["demo-network-dev-public-subnet-ids"];
        assert_eq!(subnets.split(',').count(), 2);
        assert!(subnets.split(',').all(|s| s.starts_with("subnet-")));
    }

    #[test]
    fn dev_service_url_is_http() {
        let state = deploy_all("dev");
        let exports = state.exports();

        let url = &exports["demo-url-fetcher-dev-service-url"];
        assert!(url.starts_with("http://demo-url-fetcher-dev-"));
        assert!(url.ends_with(".elb.stratus.local"));
    }

    #[test]
    fn prod_service_url_is_https() {
        let state = deploy_all("prod");
        let exports = state.exports();

        assert!(exports["demo-url-fetcher-prod-service-url"].starts_with("https://"));
    }

    #[test]
    fn key_arn_embeds_key_id() {
        let state = deploy_all("dev");
        let exports = state.exports();

        let id = &exports["demo-key-dev-encryption-key-id"];
        let arn = &exports["demo-key-dev-encryption-key-arn"];
        assert!(arn.ends_with(&format!(":key/{id}")));
    }

    #[test]
    fn second_apply_reports_unchanged() {
        let mut state = DeploymentState::new("dev");
        let plan = make_plan("dev");

        for template in &plan {
            assert_eq!(
                Deployer.apply_stack(&mut state, template).unwrap(),
                ApplyOutcome::Deployed
            );
        }
        for template in &plan {
            assert_eq!(
                Deployer.apply_stack(&mut state, template).unwrap(),
                ApplyOutcome::Unchanged
            );
        }
    }

    #[test]
    fn missing_export_names_stack_and_export() {
        let mut state = DeploymentState::new("dev");
        let plan = make_plan("dev");
        let client = plan
            .iter()
            .find(|t| t.name == "demo-client-dev")
            .unwrap();

        let result = Deployer.apply_stack(&mut state, client);

        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("demo-client-dev"));
        assert!(err.contains("demo-key-dev-encryption-key-arn"));
    }

    #[test]
    fn client_environment_resolves_service_urls() {
        let state = deploy_all("dev");
        let exports = state.exports();

        // the client applied last, so the service URL it imports was
        // already exported
        let url = &exports["demo-url-fetcher-dev-service-url"];
        let resolved = substitute(
            "${import:demo-url-fetcher-dev-service-url}",
            &exports,
            "demo-client-dev",
        )
        .unwrap();
        assert_eq!(&resolved, url);
    }

    #[test]
    fn remove_stack_drops_state() {
        let mut state = deploy_all("dev");

        assert!(Deployer.remove_stack(&mut state, "demo-client-dev"));
        assert!(!state.stacks.contains_key("demo-client-dev"));
        assert!(!Deployer.remove_stack(&mut state, "demo-client-dev"));
    }

    #[test]
    fn unterminated_placeholder_passes_through() {
        let exports = BTreeMap::new();
        let resolved = substitute("${import:unclosed", &exports, "s").unwrap();
        assert_eq!(resolved, "${import:unclosed");
    }
}
