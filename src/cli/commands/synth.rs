use chrono::Utc;

use crate::cli::commands::{history_helpers, plan_helpers};
use crate::cli::context;
use crate::cli::output;
use crate::core::errors::{Result, StratusError};
use crate::core::models::history_entry::HistoryAction;
use crate::core::models::stack::{ManifestEntry, SynthManifest};
use crate::core::services::stack_graph::StackGraph;

/// Execute the `stratus synth` command.
///
/// Plans the stacks for the target environment and writes one template
/// file per stack plus a run manifest under `<output>/<environment>/`.
pub fn execute(context_pairs: &[String], output_override: Option<&str>, quiet: bool) -> Result<()> {
    let project_dir = context::project_dir();
    let planned = plan_helpers::plan(context_pairs)?;
    let env_name = planned.environment.name.clone();

    // Validates acyclicity and fixes the emission order
    let graph = StackGraph;
    let ordered = graph.order(&planned.stacks)?;

    let out_base = match output_override {
        Some(dir) => project_dir.join(dir),
        None => planned.config.out_dir(project_dir),
    };
    let out_dir = out_base.join(&env_name);
    std::fs::create_dir_all(&out_dir)?;

    if !quiet {
        output::header(&format!("Synthesizing '{env_name}'"));
    }

    let mut entries = Vec::new();
    for template in &ordered {
        let json =
            serde_json::to_string_pretty(template).map_err(|e| StratusError::SynthError {
                detail: format!("Could not serialize template for '{}': {e}", template.name),
            })?;
        std::fs::write(out_dir.join(format!("{}.template.json", template.name)), json)?;

        entries.push(ManifestEntry {
            name: template.name.clone(),
            kind: template.kind,
            template_hash: template.template_hash(),
            depends_on: template.depends_on.clone(),
        });

        if !quiet {
            output::success(&format!("{}.template.json", template.name));
        }
    }

    let manifest = SynthManifest {
        environment: env_name.clone(),
        synthesized_at: Utc::now(),
        context: plan_helpers::context_map(context_pairs),
        stacks: entries,
    };
    let manifest_json =
        serde_json::to_string_pretty(&manifest).map_err(|e| StratusError::SynthError {
            detail: format!("Could not serialize synthesis manifest: {e}"),
        })?;
    std::fs::write(out_dir.join("manifest.json"), manifest_json)?;

    let names: Vec<String> = ordered.iter().map(|t| t.name.clone()).collect();
    if !quiet {
        println!();
        output::success(&format!(
            "Synthesized {} stack(s) to {}",
            names.len(),
            out_dir.display()
        ));
    }

    history_helpers::record_history(
        project_dir,
        &planned.config,
        HistoryAction::Synth,
        &env_name,
        names,
        None,
    );

    Ok(())
}
