//! Reproducible trace commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tangle_explore::{ReproducibleTrace, ScheduleStep};

use crate::Format;

fn load(path: &Path) -> Result<ReproducibleTrace> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    text.parse()
        .with_context(|| format!("Invalid schedule file {}", path.display()))
}

/// Decodes a schedule file and prints its directives and steps.
pub fn show(path: &Path, format: Format) -> Result<()> {
    let trace = load(path)?;

    match format {
        Format::Json => {
            let json = serde_json::json!({
                "fair_scheduling": trace.fair_scheduling,
                "liveness_temperature_threshold": trace.liveness_temperature_threshold,
                "test_method": trace.test_method,
                "steps": trace.steps.steps(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Format::Toml => anyhow::bail!("Schedules have no TOML form; use --format text or json"),
        Format::Text => {
            println!("Schedule: {}", path.display());
            println!();

            println!("Directives:");
            println!(
                "  Fair scheduling: {}",
                if trace.fair_scheduling { "yes" } else { "no" }
            );
            println!(
                "  Liveness threshold: {}",
                trace
                    .liveness_temperature_threshold
                    .map_or("disabled".to_string(), |t| t.to_string())
            );
            println!(
                "  Test method: {}",
                trace.test_method.as_deref().unwrap_or("(default)")
            );
            println!();

            let scheduling = trace
                .steps
                .iter()
                .filter(|step| matches!(step, ScheduleStep::SchedulingChoice(_)))
                .count();
            println!(
                "Steps: {} ({} scheduling, {} data)",
                trace.steps.len(),
                scheduling,
                trace.steps.len() - scheduling
            );
            for (index, step) in trace.steps.iter().enumerate() {
                println!("  {:>5}  {step}", index + 1);
            }
        }
    }

    Ok(())
}

/// Checks that a schedule file parses.
pub fn validate(path: &Path) -> Result<()> {
    let trace = load(path)?;
    println!(
        "{}: ok ({} directive(s), {} step(s))",
        path.display(),
        trace.directive_count(),
        trace.steps.len()
    );
    Ok(())
}
