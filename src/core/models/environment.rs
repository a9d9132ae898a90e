use serde_yaml::Mapping;

use super::env_config::EnvironmentConfig;

/// An environment (dev, staging, prod) with its resolved settings
/// after merging overrides onto the default layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEnvironment {
    pub name: String,
    /// The merged tree, override-else-default per key.
    pub tree: Mapping,
    /// Typed view of `tree`, validated.
    pub config: EnvironmentConfig,
}

impl ResolvedEnvironment {
    /// Whether stacks in this environment serve HTTPS. Dev stays on
    /// plain HTTP unless explicitly opted in.
    pub fn use_https(&self) -> bool {
        self.name != "dev" || self.config.load_balancer.enable_https_in_dev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str, enable_in_dev: bool) -> ResolvedEnvironment {
        let mut config = EnvironmentConfig::default();
        config.load_balancer.enable_https_in_dev = enable_in_dev;
        ResolvedEnvironment {
            name: name.to_string(),
            tree: Mapping::new(),
            config,
        }
    }

    #[test]
    fn dev_defaults_to_http() {
        assert!(!env("dev", false).use_https());
    }

    #[test]
    fn dev_can_opt_into_https() {
        assert!(env("dev", true).use_https());
    }

    #[test]
    fn other_environments_use_https() {
        assert!(env("prod", false).use_https());
        assert!(env("staging", false).use_https());
    }
}
