use colored::Colorize;

use crate::cli::commands::plan_helpers;
use crate::cli::output;
use crate::core::errors::Result;
use crate::core::services::stack_graph::StackGraph;

/// Execute the `stratus list` command.
///
/// Shows the stacks planned for the target environment in deploy
/// order, with kind and dependencies. Verbose adds the exports.
pub fn execute(context_pairs: &[String], verbose: bool) -> Result<()> {
    let planned = plan_helpers::plan(context_pairs)?;
    let graph = StackGraph;
    let ordered = graph.order(&planned.stacks)?;

    output::header(&format!(
        "Stacks in '{}' ({})",
        planned.environment.name,
        ordered.len()
    ));

    let name_width = ordered
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(5)
        .max(5);

    for template in &ordered {
        let deps = if template.depends_on.is_empty() {
            String::new()
        } else {
            format!("needs {}", template.depends_on.join(", "))
        };
        println!(
            "  {:<width$}   {:<8} {}",
            template.name,
            template.kind.to_string().cyan(),
            deps.dimmed(),
            width = name_width
        );
        if verbose {
            for spec in &template.outputs {
                println!("      {} {}", "↳".dimmed(), spec.export.dimmed());
            }
        }
    }

    Ok(())
}
