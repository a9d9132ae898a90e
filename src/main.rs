mod adapters;
mod cli;
mod config;
mod core;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let args = Cli::parse();

    // Commands resolve every path relative to the project directory
    cli::context::init(args.config.as_deref());

    let result = match &args.command {
        Commands::Init => cli::commands::init::execute(args.verbose),
        Commands::Synth { output } => {
            cli::commands::synth::execute(&args.context, output.as_deref(), args.quiet)
        }
        Commands::Diff { stacks } => cli::commands::diff::execute(&args.context, stacks),
        Commands::Deploy {
            all,
            stacks,
            require_approval,
        } => cli::commands::deploy::execute(
            &args.context,
            *all,
            stacks,
            *require_approval,
            args.quiet,
        ),
        Commands::Destroy { all, stacks, force } => {
            cli::commands::destroy::execute(&args.context, *all, stacks, *force)
        }
        Commands::List => cli::commands::list::execute(&args.context, args.verbose),
        Commands::Status => cli::commands::status::execute(),
        Commands::Log {
            author,
            since,
            last,
        } => cli::commands::log::execute(&args.context, author.as_deref(), since.as_deref(), *last),
    };

    if let Err(e) = result {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}
