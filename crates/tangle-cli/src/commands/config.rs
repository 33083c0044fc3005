//! Configuration management commands.

use std::path::Path;

use anyhow::{Context, Result};
use tangle_explore::ConfigLoader;
use tangle_explore::config::Paths;

use crate::Format;

fn loader(project: &Path, include_user_config: bool) -> ConfigLoader {
    let loader = ConfigLoader::new().with_project_dir(project);
    if include_user_config {
        loader
    } else {
        loader.without_user_config()
    }
}

/// Show the effective configuration.
pub fn show(project: &Path, format: Format, include_user_config: bool) -> Result<()> {
    let config = loader(project, include_user_config)
        .load()
        .context("Failed to load configuration")?;

    match format {
        Format::Json => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        Format::Toml => {
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{toml_str}");
        }
        Format::Text => {
            println!("Tangle Configuration");
            println!("====================\n");

            println!("Exploration:");
            println!("  Iterations: {}", config.iterations);
            println!(
                "  Timeout: {}",
                config
                    .timeout()
                    .map_or("none".to_string(), |t| format!("{}s", t.as_secs()))
            );
            println!("  Strategy: {}", config.strategy);
            println!(
                "  Seed: {}",
                config.seed.map_or("None".to_string(), |s| s.to_string())
            );
            println!("  Full exploration: {}", config.full_exploration);
            println!("  Incremental seed: {}", config.incremental_seed);
            println!(
                "  Test method: {}",
                config.test_method.as_deref().unwrap_or("(default)")
            );
            println!();

            println!("Scheduling:");
            println!("  Max fair steps: {}", config.max_fair_steps);
            println!("  Max unfair steps: {}", config.max_unfair_steps);
            println!("  Liveness checking: {}", config.liveness_checking);
            println!(
                "  Liveness threshold: {}",
                config.liveness_temperature_threshold
            );
            println!();

            println!("Output:");
            println!("  Verbose: {}", config.verbose);
            println!("  XML log: {}", config.xml_log);
            println!("  Activity coverage: {}", config.report_activity_coverage);
        }
    }

    Ok(())
}

/// Validate configuration files.
pub fn validate(project: &Path) -> Result<()> {
    println!("Validating configuration in {}...", project.display());

    for file in [
        Paths::project_config_file(project),
        Paths::local_config_file(project),
    ] {
        if file.exists() {
            println!("  found {}", file.display());
        }
    }

    loader(project, true)
        .load()
        .context("Configuration is invalid")?;

    println!("Configuration is valid.");
    Ok(())
}
