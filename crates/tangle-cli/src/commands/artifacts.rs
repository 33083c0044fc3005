//! Artifact directory commands.

use std::path::Path;

use anyhow::{Context, Result};
use tangle_explore::next_artifact_index;

/// Prints the index the next run writing `name` artifacts into `dir` gets.
pub fn next_index(dir: &Path, name: &str) -> Result<()> {
    let index = next_artifact_index(dir, name)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;
    println!("{index}");
    Ok(())
}
