use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, StratusError};

/// Valid Fargate-style cpu values and the memory range (MiB) each allows.
const CPU_MEMORY_TABLE: &[(u32, u32, u32)] = &[
    (256, 512, 2048),
    (512, 1024, 4096),
    (1024, 2048, 8192),
    (2048, 4096, 16384),
    (4096, 8192, 30720),
];

/// Component names reserved for the fixed stacks; a service may not
/// reuse them, or its stack name would collide.
pub const RESERVED_COMPONENTS: &[&str] = &["key", "network", "cluster", "client"];

/// Fully typed view of one resolved environment tree.
///
/// Every field carries a default equal to the baseline the tool assumes
/// when a section (or key) is absent, so a sparse settings document is
/// valid. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub vpc: VpcConfig,
    pub ecs: EcsConfig,
    pub lambda: LambdaConfig,
    pub load_balancer: LoadBalancerConfig,
    pub services: BTreeMap<String, ServiceSpec>,
}

impl EnvironmentConfig {
    /// Validate the whole configuration, collecting every problem before
    /// failing so the user can fix them in one pass.
    pub fn validate(&self) -> Result<()> {
        let mut issues = Vec::new();

        self.ecs.collect_issues(&mut issues);
        self.lambda.collect_issues(&mut issues);

        if self.services.is_empty() {
            issues.push("no services defined; add at least one entry under 'services'".into());
        }

        for (name, spec) in &self.services {
            spec.collect_issues(name, &mut issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(StratusError::InvalidConfig {
                detail: format!(
                    "{} problem(s) in the resolved settings:\n    - {}",
                    issues.len(),
                    issues.join("\n    - ")
                ),
            })
        }
    }
}

/// The `vpc` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VpcConfig {
    pub cidr: String,
    pub max_azs: u32,
    pub nat_gateways: u32,
    pub subnet_configuration: SubnetConfiguration,
}

impl Default for VpcConfig {
    fn default() -> Self {
        Self {
            cidr: "10.0.0.0/16".to_string(),
            max_azs: 2,
            nat_gateways: 1,
            subnet_configuration: SubnetConfiguration::default(),
        }
    }
}

/// CIDR mask per subnet tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubnetConfiguration {
    pub public_subnet_cidr_mask: u8,
    pub private_subnet_cidr_mask: u8,
    pub isolated_subnet_cidr_mask: u8,
}

impl Default for SubnetConfiguration {
    fn default() -> Self {
        Self {
            public_subnet_cidr_mask: 24,
            private_subnet_cidr_mask: 24,
            isolated_subnet_cidr_mask: 28,
        }
    }
}

/// The `ecs` section: task sizing shared by every service stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsConfig {
    pub cpu: u32,
    pub memory_limit_mib: u32,
    pub desired_count: u32,
    pub auto_scaling: AutoScalingConfig,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            cpu: 512,
            memory_limit_mib: 1024,
            desired_count: 1,
            auto_scaling: AutoScalingConfig::default(),
        }
    }
}

impl EcsConfig {
    fn collect_issues(&self, issues: &mut Vec<String>) {
        match CPU_MEMORY_TABLE.iter().find(|(cpu, _, _)| *cpu == self.cpu) {
            None => {
                let valid: Vec<String> = CPU_MEMORY_TABLE
                    .iter()
                    .map(|(cpu, _, _)| cpu.to_string())
                    .collect();
                issues.push(format!(
                    "ecs.cpu must be one of {} (got {})",
                    valid.join(", "),
                    self.cpu
                ));
            }
            Some((cpu, min_mem, max_mem)) => {
                if self.memory_limit_mib < *min_mem || self.memory_limit_mib > *max_mem {
                    issues.push(format!(
                        "ecs.memory_limit_mib must be between {min_mem} and {max_mem} \
                         for cpu={cpu} (got {})",
                        self.memory_limit_mib
                    ));
                }
            }
        }

        if self.desired_count == 0 {
            issues.push("ecs.desired_count must be at least 1".into());
        }

        let scaling = &self.auto_scaling;
        if scaling.enabled {
            if scaling.max_capacity < scaling.min_capacity {
                issues.push(format!(
                    "ecs.auto_scaling.max_capacity ({}) is below min_capacity ({})",
                    scaling.max_capacity, scaling.min_capacity
                ));
            }
            if scaling.target_cpu_utilization == 0 || scaling.target_cpu_utilization > 100 {
                issues.push(format!(
                    "ecs.auto_scaling.target_cpu_utilization must be 1-100 (got {})",
                    scaling.target_cpu_utilization
                ));
            }
        }
    }
}

/// The `ecs.auto_scaling` subsection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoScalingConfig {
    pub enabled: bool,
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub target_cpu_utilization: u32,
}

impl Default for AutoScalingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_capacity: 1,
            max_capacity: 4,
            target_cpu_utilization: 70,
        }
    }
}

/// The `lambda` section: client function sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LambdaConfig {
    pub memory_size: u32,
    pub timeout_seconds: u64,
    pub reserved_concurrent_executions: Option<u32>,
    pub environment_variables: BTreeMap<String, String>,
}

impl Default for LambdaConfig {
    fn default() -> Self {
        Self {
            memory_size: 256,
            timeout_seconds: 30,
            reserved_concurrent_executions: None,
            environment_variables: BTreeMap::new(),
        }
    }
}

impl LambdaConfig {
    fn collect_issues(&self, issues: &mut Vec<String>) {
        if self.timeout_seconds == 0 {
            issues.push("lambda.timeout_seconds must be at least 1".into());
        }
        if self.memory_size < 128 {
            issues.push(format!(
                "lambda.memory_size must be at least 128 MiB (got {})",
                self.memory_size
            ));
        }
    }
}

/// The `load_balancer` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadBalancerConfig {
    pub idle_timeout_seconds: u64,
    pub deletion_protection: bool,
    pub http_to_https_redirect: bool,
    pub enable_https_in_dev: bool,
    pub certificate_arn: Option<String>,
    pub domain_name: Option<String>,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: 60,
            deletion_protection: false,
            http_to_https_redirect: true,
            enable_https_in_dev: false,
            certificate_arn: None,
            domain_name: None,
        }
    }
}

/// One entry under `services`: a deployable server that gets its own
/// service stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub port: u16,
    /// Routing pattern on the load balancer; defaults to `/{name}*`.
    #[serde(default)]
    pub path_pattern: Option<String>,
    /// Image reference; defaults to `{project}/{name}:latest`.
    #[serde(default)]
    pub image: Option<String>,
    /// Container environment. Merged over the injected SERVER_* defaults.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl ServiceSpec {
    fn collect_issues(&self, name: &str, issues: &mut Vec<String>) {
        if !is_valid_name(name) {
            issues.push(format!(
                "service name '{name}' is invalid; use lowercase letters, \
                 digits and hyphens, starting with a letter"
            ));
        }
        if RESERVED_COMPONENTS.contains(&name) {
            issues.push(format!(
                "service name '{name}' is reserved for a built-in stack component"
            ));
        }
        if self.port < 1024 {
            issues.push(format!(
                "services.{name}.port must be between 1024 and 65535 (got {})",
                self.port
            ));
        }
    }
}

/// Names for projects, environments, and services: lowercase alphanumeric
/// with hyphens, starting with a letter.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: a config with one valid service.
    fn valid_config() -> EnvironmentConfig {
        let mut config = EnvironmentConfig::default();
        config.services.insert(
            "web".to_string(),
            ServiceSpec {
                port: 8001,
                path_pattern: None,
                image: None,
                environment: BTreeMap::new(),
            },
        );
        config
    }

    #[test]
    fn defaults_match_baseline() {
        let config = EnvironmentConfig::default();

        assert_eq!(config.vpc.cidr, "10.0.0.0/16");
        assert_eq!(config.vpc.max_azs, 2);
        assert_eq!(config.vpc.nat_gateways, 1);
        assert_eq!(config.vpc.subnet_configuration.isolated_subnet_cidr_mask, 28);
        assert_eq!(config.ecs.cpu, 512);
        assert_eq!(config.ecs.memory_limit_mib, 1024);
        assert_eq!(config.ecs.desired_count, 1);
        assert!(!config.ecs.auto_scaling.enabled);
        assert_eq!(config.lambda.memory_size, 256);
        assert_eq!(config.lambda.timeout_seconds, 30);
        assert_eq!(config.load_balancer.idle_timeout_seconds, 60);
        assert!(config.load_balancer.http_to_https_redirect);
        assert!(!config.load_balancer.enable_https_in_dev);
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn empty_services_rejected() {
        let config = EnvironmentConfig::default();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("no services defined"));
    }

    #[test]
    fn invalid_cpu_rejected() {
        let mut config = valid_config();
        config.ecs.cpu = 300;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("ecs.cpu must be one of"));
    }

    #[test]
    fn memory_outside_cpu_range_rejected() {
        let mut config = valid_config();
        config.ecs.cpu = 256;
        config.ecs.memory_limit_mib = 4096;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("between 512 and 2048"));
    }

    #[test]
    fn memory_within_cpu_range_accepted() {
        let mut config = valid_config();
        config.ecs.cpu = 1024;
        config.ecs.memory_limit_mib = 8192;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn privileged_port_rejected() {
        let mut config = valid_config();
        config
            .services
            .insert("api".to_string(), ServiceSpec {
                port: 80,
                path_pattern: None,
                image: None,
                environment: BTreeMap::new(),
            });
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("services.api.port"));
    }

    #[test]
    fn reserved_service_name_rejected() {
        let mut config = valid_config();
        config
            .services
            .insert("network".to_string(), ServiceSpec {
                port: 8002,
                path_pattern: None,
                image: None,
                environment: BTreeMap::new(),
            });
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("reserved"));
    }

    #[test]
    fn uppercase_service_name_rejected() {
        let mut config = valid_config();
        config
            .services
            .insert("Web".to_string(), ServiceSpec {
                port: 8002,
                path_pattern: None,
                image: None,
                environment: BTreeMap::new(),
            });
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("invalid"));
    }

    #[test]
    fn scaling_bounds_checked() {
        let mut config = valid_config();
        config.ecs.auto_scaling.enabled = true;
        config.ecs.auto_scaling.min_capacity = 5;
        config.ecs.auto_scaling.max_capacity = 2;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("below min_capacity"));
    }

    #[test]
    fn disabled_scaling_not_checked() {
        let mut config = valid_config();
        config.ecs.auto_scaling.enabled = false;
        config.ecs.auto_scaling.max_capacity = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn multiple_issues_collected() {
        let mut config = valid_config();
        config.ecs.cpu = 300;
        config.lambda.timeout_seconds = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("2 problem(s)"));
    }

    #[test]
    fn name_validation() {
        assert!(is_valid_name("url-fetcher"));
        assert!(is_valid_name("web2"));
        assert!(!is_valid_name("2web"));
        assert!(!is_valid_name("Web"));
        assert!(!is_valid_name("-web"));
        assert!(!is_valid_name(""));
    }
}
