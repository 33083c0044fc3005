//! Tangle operator CLI.
//!
//! Inspects what an exploration left behind and the configuration it would
//! run with.
//!
//! # Quick Start
//!
//! ```bash
//! # Decode a reproducible trace
//! tangle schedule show out/Program_0_0.schedule
//!
//! # Index the next run's artifacts would get
//! tangle artifacts next-index out/ Program_0
//!
//! # Effective configuration for a project
//! tangle config show --project .
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

/// Tangle - systematic exploration for concurrency bugs.
#[derive(Parser)]
#[command(name = "tangle")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Reproducible trace commands.
    #[command(subcommand)]
    Schedule(ScheduleCommands),

    /// Artifact directory commands.
    #[command(subcommand)]
    Artifacts(ArtifactCommands),

    /// Configuration commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ScheduleCommands {
    /// Decode a .schedule file.
    Show {
        /// Path to the .schedule file.
        path: PathBuf,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Check that a .schedule file parses.
    Validate {
        /// Path to the .schedule file.
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum ArtifactCommands {
    /// Print the index the next emitted artifacts would use.
    NextIndex {
        /// Artifact directory.
        dir: PathBuf,

        /// Base file name (e.g. Program_0).
        name: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show {
        /// Project directory containing tangle.toml.
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "toml")]
        format: Format,

        /// Ignore ~/.config/tangle/config.toml.
        #[arg(long)]
        no_user_config: bool,
    },

    /// Validate the configuration without printing it.
    Validate {
        /// Project directory containing tangle.toml.
        #[arg(short, long, default_value = ".")]
        project: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Toml,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Schedule(cmd) => match cmd {
            ScheduleCommands::Show { path, format } => commands::schedule::show(&path, format),
            ScheduleCommands::Validate { path } => commands::schedule::validate(&path),
        },
        Commands::Artifacts(cmd) => match cmd {
            ArtifactCommands::NextIndex { dir, name } => {
                commands::artifacts::next_index(&dir, &name)
            }
        },
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show {
                project,
                format,
                no_user_config,
            } => commands::config::show(&project, format, !no_user_config),
            ConfigCommands::Validate { project } => commands::config::validate(&project),
        },
    }
}
