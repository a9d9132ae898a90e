use std::collections::BTreeMap;

use crate::cli::context;
use crate::config::project::ProjectConfig;
use crate::config::settings::SettingsDoc;
use crate::core::errors::Result;
use crate::core::models::environment::ResolvedEnvironment;
use crate::core::models::stack::StackTemplate;
use crate::core::services::settings_resolver::SettingsResolver;
use crate::core::services::stack_planner::StackPlanner;

/// Everything a synthesis-driven command works from: the project
/// manifest, the resolved environment, and the planned stacks.
pub struct PlannedProject {
    pub config: ProjectConfig,
    pub environment: ResolvedEnvironment,
    pub stacks: Vec<StackTemplate>,
}

/// Look up a `key=value` pair passed via repeated `--context` flags.
/// The last occurrence of a key wins.
pub fn context_value<'a>(pairs: &'a [String], key: &str) -> Option<&'a str> {
    pairs.iter().rev().find_map(|pair| {
        pair.split_once('=')
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v)
    })
}

/// Collect all well-formed `key=value` context pairs into a map.
/// The last occurrence of a key wins; entries without `=` are ignored.
pub fn context_map(pairs: &[String]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Pick the target environment name: `--context environment=<name>`
/// wins, then the manifest's `default_environment`, then `dev`.
pub fn environment_name(context_pairs: &[String], config: &ProjectConfig) -> String {
    context_value(context_pairs, "environment")
        .map(str::to_string)
        .or_else(|| config.project.default_environment.clone())
        .unwrap_or_else(|| "dev".to_string())
}

/// Load the project, resolve the requested environment, and plan its
/// stacks. Shared entry point for synth, diff, deploy, destroy, and
/// list.
pub fn plan(context_pairs: &[String]) -> Result<PlannedProject> {
    let project_dir = context::project_dir();
    let config = ProjectConfig::load(project_dir)?;

    let name = environment_name(context_pairs, &config);
    context::validate_env_name(&name)?;

    let doc = SettingsDoc::load(&config.settings_path(project_dir))?;
    let resolver = SettingsResolver;
    let environment = resolver.resolve(&doc, &name)?;

    let planner = StackPlanner::new(&config.project.name, &environment);
    let stacks = planner.plan();

    Ok(PlannedProject {
        config,
        environment,
        stacks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::project::ProjectSection;

    fn pairs(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn make_config(default_env: Option<&str>) -> ProjectConfig {
        ProjectConfig {
            project: ProjectSection {
                name: "demo".to_string(),
                format_version: 1,
                settings: "settings.yaml".to_string(),
                output: "stratus.out".to_string(),
                default_environment: default_env.map(str::to_string),
            },
            history: None,
        }
    }

    #[test]
    fn environment_name_prefers_context() {
        let config = make_config(Some("staging"));
        let p = pairs(&["environment=prod"]);
        assert_eq!(environment_name(&p, &config), "prod");
    }

    #[test]
    fn environment_name_falls_back_to_manifest_default() {
        let config = make_config(Some("staging"));
        assert_eq!(environment_name(&[], &config), "staging");
    }

    #[test]
    fn environment_name_defaults_to_dev() {
        let config = make_config(None);
        assert_eq!(environment_name(&[], &config), "dev");
    }

    #[test]
    fn context_value_finds_pair() {
        let p = pairs(&["environment=prod", "region=eu-west-1"]);
        assert_eq!(context_value(&p, "environment"), Some("prod"));
        assert_eq!(context_value(&p, "region"), Some("eu-west-1"));
    }

    #[test]
    fn context_value_last_occurrence_wins() {
        let p = pairs(&["environment=dev", "environment=prod"]);
        assert_eq!(context_value(&p, "environment"), Some("prod"));
    }

    #[test]
    fn context_value_missing_key() {
        let p = pairs(&["environment=dev"]);
        assert_eq!(context_value(&p, "account"), None);
    }

    #[test]
    fn context_value_ignores_malformed_pair() {
        let p = pairs(&["environment", "environment=staging"]);
        assert_eq!(context_value(&p, "environment"), Some("staging"));
    }

    #[test]
    fn context_value_keeps_equals_in_value() {
        let p = pairs(&["flag=a=b"]);
        assert_eq!(context_value(&p, "flag"), Some("a=b"));
    }

    #[test]
    fn context_map_collects_pairs_last_wins() {
        let p = pairs(&["environment=dev", "region=eu", "environment=prod", "bogus"]);
        let map = context_map(&p);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("environment").map(String::as_str), Some("prod"));
        assert_eq!(map.get("region").map(String::as_str), Some("eu"));
    }
}
