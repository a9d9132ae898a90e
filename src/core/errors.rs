use std::path::PathBuf;

/// All domain errors for Stratus.
///
/// Each variant provides enough context to diagnose the issue
/// without needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum StratusError {
    #[error(
        "No project manifest at {path}\n\n  \
         Stratus needs a stratus.toml to know where the settings document\n  \
         and output directory live.\n\n  \
         Solutions:\n    \
         → Run 'stratus init' to scaffold a new project here\n    \
         → Or point at an existing manifest: stratus --config path/to/stratus.toml"
    )]
    ProjectNotFound { path: PathBuf },

    #[error("Invalid project manifest: {detail}")]
    InvalidProject { detail: String },

    #[error(
        "Project format version {project_version} is newer than this build supports ({supported_version})\n\n  \
         Upgrade stratus, then retry."
    )]
    FormatVersionTooNew {
        project_version: u32,
        supported_version: u32,
    },

    #[error(
        "Settings document not found: {path}\n\n  \
         The manifest's [project] settings entry points at a file that\n  \
         does not exist. Create it, or fix the path in stratus.toml."
    )]
    SettingsNotFound { path: PathBuf },

    #[error(
        "Invalid settings document: {detail}\n\n  \
         Expected a YAML mapping with one top-level key per environment\n  \
         ('default', 'dev', 'prod', ...), each holding vpc/ecs/lambda/\n  \
         load_balancer/services sections."
    )]
    InvalidSettings { detail: String },

    #[error(
        "Environment '{name}' not found\n\n  \
         Available environments: {available}\n  \
         Check the top-level keys of your settings document."
    )]
    EnvironmentNotFound { name: String, available: String },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error(
        "Circular stack dependency detected: {chain}\n\n  \
         Stacks must form an acyclic graph (network → cluster → services\n  \
         → client). Two or more stacks depend on each other in a loop."
    )]
    CircularDependency { chain: String },

    #[error(
        "No stack matches '{pattern}'\n\n  \
         Stacks in this environment: {available}\n  \
         Patterns support '*' wildcards, e.g. 'demo-*-dev'."
    )]
    UnknownStack { pattern: String, available: String },

    #[error("Synthesis error: {detail}")]
    SynthError { detail: String },

    #[error(
        "Stack '{stack}' imports '{export}', but nothing exports it\n\n  \
         The exporting stack has not been deployed and is not part of\n  \
         this deployment.\n\n  \
         Solutions:\n    \
         → Deploy the full dependency chain: stratus deploy --all\n    \
         → Or include the missing stack in your selection"
    )]
    MissingExport { stack: String, export: String },

    #[error("State error: {detail}")]
    StateError { detail: String },

    #[error("History log error: {detail}")]
    HistoryError { detail: String },

    #[error("Aborted, no changes applied")]
    Aborted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StratusError>;
