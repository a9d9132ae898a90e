pub mod commands;
pub mod context;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};

/// Describe your stacks once. Synthesize, diff, and deploy per environment.
#[derive(Parser, Debug)]
#[command(name = "stratus", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Context value as key=value. Repeat to set several: -c environment=prod
    #[arg(short = 'c', long = "context", global = true)]
    pub context: Vec<String>,

    /// Path to the project manifest (stratus.toml) or its directory
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode: only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a Stratus project in the current directory
    Init,

    /// Synthesize stack templates for an environment
    Synth {
        /// Write templates here instead of the configured output directory
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Compare planned stacks against the deployed state
    Diff {
        /// Stacks to compare, with * wildcards (default: all)
        stacks: Vec<String>,
    },

    /// Deploy stacks to the target environment
    Deploy {
        /// Deploy every stack
        #[arg(long)]
        all: bool,

        /// Stacks to deploy, with * wildcards
        stacks: Vec<String>,

        /// When to ask for confirmation before applying changes
        #[arg(long, value_enum, default_value_t = ApprovalMode::Always)]
        require_approval: ApprovalMode,
    },

    /// Remove deployed stacks from the target environment
    Destroy {
        /// Destroy every stack
        #[arg(long)]
        all: bool,

        /// Stacks to destroy, with * wildcards
        stacks: Vec<String>,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// List the stacks planned for an environment
    List,

    /// Show full project status
    Status,

    /// Show deployment history
    Log {
        /// Filter by author
        #[arg(long)]
        author: Option<String>,
        /// Filter entries since this date (ISO 8601)
        #[arg(long)]
        since: Option<String>,
        /// Show last N entries
        #[arg(long)]
        last: Option<usize>,
    },
}

/// Whether `deploy` pauses for a yes/no prompt before applying.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApprovalMode {
    /// Ask before applying changes
    Always,
    /// Apply without asking
    Never,
}
