use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Value, json};

use crate::core::models::env_config::ServiceSpec;
use crate::core::models::environment::ResolvedEnvironment;
use crate::core::models::stack::{OutputSpec, StackKind, StackTemplate};

/// Plans the stack set for one environment.
///
/// Produces, in creation order: the key stack, the network stack, the
/// cluster stack, one service stack per `services` entry, and the
/// client stack. Cross-stack values are referenced through
/// `${import:EXPORT-NAME}` placeholders, from which each template's
/// `depends_on` is derived.
pub struct StackPlanner<'a> {
    project: &'a str,
    env: &'a ResolvedEnvironment,
}

impl<'a> StackPlanner<'a> {
    pub fn new(project: &'a str, env: &'a ResolvedEnvironment) -> Self {
        Self { project, env }
    }

    /// Build every stack template for the environment.
    ///
    /// The returned order is the planner's creation order; topological
    /// sorting happens later and uses this order to break ties, so
    /// synthesis output is stable across runs.
    pub fn plan(&self) -> Vec<StackTemplate> {
        let mut templates = vec![self.key_stack(), self.network_stack(), self.cluster_stack()];
        for (name, spec) in &self.env.config.services {
            templates.push(self.service_stack(name, spec));
        }
        templates.push(self.client_stack());
        derive_dependencies(&mut templates);
        templates
    }

    /// `{project}-{component}-{environment}`.
    fn stack_name(&self, component: &str) -> String {
        format!("{}-{}-{}", self.project, component, self.env.name)
    }

    fn tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        tags.insert("Project".to_string(), self.project.to_string());
        tags.insert("Environment".to_string(), self.env.name.to_string());
        tags
    }

    fn template(
        &self,
        component: &str,
        kind: StackKind,
        resources: BTreeMap<String, Value>,
        output_keys: &[(&str, &str)],
    ) -> StackTemplate {
        let name = self.stack_name(component);
        let outputs = output_keys
            .iter()
            .map(|(key, description)| OutputSpec {
                key: (*key).to_string(),
                export: format!("{name}-{key}"),
                description: (*description).to_string(),
            })
            .collect();
        StackTemplate {
            name,
            kind,
            environment: self.env.name.to_string(),
            resources,
            outputs,
            tags: self.tags(),
            depends_on: Vec::new(),
        }
    }

    /// Encryption key shared by services and the client. Retained on
    /// destroy in prod, dropped elsewhere.
    fn key_stack(&self) -> StackTemplate {
        let name = self.stack_name("key");
        let removal_policy = if self.env.name == "prod" {
            "retain"
        } else {
            "destroy"
        };
        let mut resources = BTreeMap::new();
        resources.insert(
            "encryption-key".to_string(),
            json!({
                "type": "security/encryption-key",
                "properties": {
                    "alias": format!("alias/{name}"),
                    "rotation_enabled": true,
                    "pending_window_days": 7,
                    "removal_policy": removal_policy,
                },
            }),
        );
        self.template("key", StackKind::Key, resources, &[
            ("encryption-key-arn", "Encryption key ARN"),
            ("encryption-key-id", "Encryption key id"),
        ])
    }

    /// VPC with three subnet tiers plus one security group per consumer
    /// (load balancer, services, client).
    fn network_stack(&self) -> StackTemplate {
        let vpc = &self.env.config.vpc;
        let use_https = self.env.use_https();

        let mut alb_ingress = vec![json!({"port": 80, "source": "0.0.0.0/0"})];
        if use_https {
            alb_ingress.push(json!({"port": 443, "source": "0.0.0.0/0"}));
        }

        let mut service_ports: Vec<u16> =
            self.env.config.services.values().map(|s| s.port).collect();
        service_ports.sort_unstable();
        service_ports.dedup();
        let ecs_ingress: Vec<Value> = service_ports
            .iter()
            .map(|port| json!({"port": port, "source_security_group": "alb-security-group"}))
            .collect();

        let mut resources = BTreeMap::new();
        resources.insert(
            "vpc".to_string(),
            json!({
                "type": "network/vpc",
                "properties": {
                    "cidr": vpc.cidr,
                    "max_azs": vpc.max_azs,
                    "nat_gateways": vpc.nat_gateways,
                    "subnets": {
                        "public": {"cidr_mask": vpc.subnet_configuration.public_subnet_cidr_mask},
                        "private": {"cidr_mask": vpc.subnet_configuration.private_subnet_cidr_mask},
                        "isolated": {"cidr_mask": vpc.subnet_configuration.isolated_subnet_cidr_mask},
                    },
                },
            }),
        );
        resources.insert(
            "alb-security-group".to_string(),
            json!({
                "type": "network/security-group",
                "properties": {
                    "vpc": "vpc",
                    "description": "Load balancer ingress",
                    "ingress": alb_ingress,
                },
            }),
        );
        resources.insert(
            "ecs-security-group".to_string(),
            json!({
                "type": "network/security-group",
                "properties": {
                    "vpc": "vpc",
                    "description": "Service traffic from the load balancer",
                    "ingress": ecs_ingress,
                },
            }),
        );
        resources.insert(
            "lambda-security-group".to_string(),
            json!({
                "type": "network/security-group",
                "properties": {
                    "vpc": "vpc",
                    "description": "Client egress",
                    "ingress": [],
                },
            }),
        );

        self.template("network", StackKind::Network, resources, &[
            ("vpc-id", "VPC id"),
            ("public-subnet-ids", "Public subnet ids"),
            ("private-subnet-ids", "Private subnet ids"),
            ("isolated-subnet-ids", "Isolated subnet ids"),
            ("alb-sg-id", "Load balancer security group id"),
            ("ecs-sg-id", "Service security group id"),
            ("lambda-sg-id", "Client security group id"),
        ])
    }

    fn cluster_stack(&self) -> StackTemplate {
        let network = self.stack_name("network");
        let mut resources = BTreeMap::new();
        resources.insert(
            "cluster".to_string(),
            json!({
                "type": "compute/cluster",
                "properties": {
                    "name": format!("{}-{}", self.project, self.env.name),
                    "vpc": format!("${{import:{network}-vpc-id}}"),
                    "container_insights": self.env.name != "dev",
                },
            }),
        );
        self.template("cluster", StackKind::Cluster, resources, &[
            ("cluster-name", "Cluster name"),
            ("cluster-arn", "Cluster ARN"),
        ])
    }

    /// One load-balanced containerized service.
    fn service_stack(&self, service: &str, spec: &ServiceSpec) -> StackTemplate {
        let config = &self.env.config;
        let lb = &config.load_balancer;
        let use_https = self.env.use_https();
        let name = self.stack_name(service);
        let network = self.stack_name("network");
        let cluster = self.stack_name("cluster");
        let key = self.stack_name("key");

        let image = spec
            .image
            .clone()
            .unwrap_or_else(|| format!("{}/{service}:latest", self.project));
        let path_pattern = spec
            .path_pattern
            .clone()
            .unwrap_or_else(|| format!("/{service}*"));

        let mut resources = BTreeMap::new();
        resources.insert(
            "task-definition".to_string(),
            json!({
                "type": "compute/task-definition",
                "properties": {
                    "cpu": config.ecs.cpu,
                    "memory_limit_mib": config.ecs.memory_limit_mib,
                    "container": {
                        "image": image,
                        "port": spec.port,
                        "environment": container_environment(spec),
                        "health_check": {
                            "command": format!(
                                "curl -f http://localhost:{}/health || exit 1",
                                spec.port
                            ),
                            "interval_seconds": 30,
                            "timeout_seconds": 5,
                            "retries": 3,
                            "start_period_seconds": 60,
                        },
                        "logging": {
                            "group": format!("/ecs/{service}"),
                            "retention_days": 7,
                            "stream_prefix": service,
                        },
                    },
                    "encryption_key": format!("${{import:{key}-encryption-key-arn}}"),
                },
            }),
        );
        resources.insert(
            "service".to_string(),
            json!({
                "type": "compute/service",
                "properties": {
                    "cluster": format!("${{import:{cluster}-cluster-name}}"),
                    "task_definition": "task-definition",
                    "desired_count": config.ecs.desired_count,
                    "security_group": format!("${{import:{network}-ecs-sg-id}}"),
                    "subnets": format!("${{import:{network}-private-subnet-ids}}"),
                    "auto_scaling": {
                        "enabled": config.ecs.auto_scaling.enabled,
                        "min_capacity": config.ecs.auto_scaling.min_capacity,
                        "max_capacity": config.ecs.auto_scaling.max_capacity,
                        "target_cpu_utilization": config.ecs.auto_scaling.target_cpu_utilization,
                    },
                },
            }),
        );

        let mut listeners = Vec::new();
        if use_https {
            let certificate: Value = match &lb.certificate_arn {
                Some(arn) => json!({"certificate_arn": arn}),
                None => json!({"certificate": "certificate"}),
            };
            if lb.certificate_arn.is_none() {
                let domain = lb
                    .domain_name
                    .clone()
                    .unwrap_or_else(|| format!("{name}.example.com"));
                resources.insert(
                    "certificate".to_string(),
                    json!({
                        "type": "security/certificate",
                        "properties": {
                            "domain_name": domain,
                            "validation": "email",
                        },
                    }),
                );
            }
            listeners.push(json!({
                "port": 443,
                "protocol": "HTTPS",
                "minimum_tls_version": "TLS1.2",
                "tls": certificate,
                "action": {"forward": "target-group"},
            }));
            listeners.push(json!({
                "port": 80,
                "protocol": "HTTP",
                "action": if lb.http_to_https_redirect {
                    json!({"redirect": {"port": 443, "status": "HTTP_301"}})
                } else {
                    json!({"forward": "target-group"})
                },
            }));
        } else {
            listeners.push(json!({
                "port": 80,
                "protocol": "HTTP",
                "action": {"forward": "target-group"},
            }));
        }

        resources.insert(
            "load-balancer".to_string(),
            json!({
                "type": "network/load-balancer",
                "properties": {
                    "internet_facing": true,
                    "https": use_https,
                    "idle_timeout_seconds": lb.idle_timeout_seconds,
                    "deletion_protection": lb.deletion_protection,
                    "drop_invalid_header_fields": true,
                    "security_group": format!("${{import:{network}-alb-sg-id}}"),
                    "subnets": format!("${{import:{network}-public-subnet-ids}}"),
                    "listeners": listeners,
                },
            }),
        );
        resources.insert(
            "target-group".to_string(),
            json!({
                "type": "network/target-group",
                "properties": {
                    "port": spec.port,
                    "protocol": "HTTP",
                    "path_pattern": path_pattern,
                    "health_check": {
                        "path": "/health",
                        "healthy_threshold": 2,
                        "unhealthy_threshold": 3,
                    },
                },
            }),
        );

        self.template(service, StackKind::Service, resources, &[
            ("service-name", "Service name"),
            ("lb-dns", "Load balancer DNS name"),
            ("service-url", "Base URL of the service"),
        ])
    }

    /// The client function that calls every service.
    fn client_stack(&self) -> StackTemplate {
        let config = &self.env.config.lambda;
        let network = self.stack_name("network");
        let key = self.stack_name("key");

        let mut environment: BTreeMap<String, String> =
            config.environment_variables.clone();
        for service in self.env.config.services.keys() {
            let var = format!("{}_URL", service.to_uppercase().replace('-', "_"));
            let export = format!("{}-service-url", self.stack_name(service));
            environment.insert(var, format!("${{import:{export}}}"));
        }

        let visibility_timeout = config.timeout_seconds * 6;
        let mut resources = BTreeMap::new();
        resources.insert(
            "dead-letter-queue".to_string(),
            json!({
                "type": "messaging/queue",
                "properties": {
                    "retention_days": 14,
                    "visibility_timeout_seconds": visibility_timeout,
                    "encryption_key": format!("${{import:{key}-encryption-key-arn}}"),
                },
            }),
        );
        resources.insert(
            "function".to_string(),
            json!({
                "type": "compute/function",
                "properties": {
                    "name": format!("{}-client-{}", self.project, self.env.name),
                    "memory_size": config.memory_size,
                    "timeout_seconds": config.timeout_seconds,
                    "reserved_concurrent_executions": config.reserved_concurrent_executions,
                    "retry_attempts": 2,
                    "on_failure": "dead-letter-queue",
                    "environment": environment,
                    "vpc": format!("${{import:{network}-vpc-id}}"),
                    "subnets": format!("${{import:{network}-private-subnet-ids}}"),
                    "security_group": format!("${{import:{network}-lambda-sg-id}}"),
                },
            }),
        );

        self.template("client", StackKind::Client, resources, &[
            ("function-name", "Client function name"),
            ("function-arn", "Client function ARN"),
            ("dlq-url", "Dead letter queue URL"),
        ])
    }
}

/// Injected server defaults, overlaid by the user-supplied environment.
fn container_environment(spec: &ServiceSpec) -> BTreeMap<String, String> {
    let mut environment = BTreeMap::new();
    environment.insert("SERVER_PORT".to_string(), spec.port.to_string());
    environment.insert("SERVER_HOST".to_string(), "0.0.0.0".to_string());
    environment.insert("SERVER_LOG_LEVEL".to_string(), "info".to_string());
    environment.insert("SERVER_DEBUG".to_string(), "false".to_string());
    environment.insert("SERVER_RATE_LIMIT".to_string(), "60".to_string());
    for (key, value) in &spec.environment {
        environment.insert(key.clone(), value.clone());
    }
    environment
}

/// Fill in `depends_on` from each template's imports. Export names are
/// `{stack}-{key}`, so the owning stack is the longest planned name
/// that prefixes the export.
fn derive_dependencies(templates: &mut [StackTemplate]) {
    let names: Vec<String> = templates.iter().map(|t| t.name.clone()).collect();
    for template in templates.iter_mut() {
        let mut deps = BTreeSet::new();
        for import in template.imports() {
            let owner = names
                .iter()
                .filter(|name| {
                    *name != &template.name && import.starts_with(&format!("{name}-"))
                })
                .max_by_key(|name| name.len());
            if let Some(owner) = owner {
                deps.insert(owner.clone());
            }
        }
        template.depends_on = deps.into_iter().collect();
    }
}
