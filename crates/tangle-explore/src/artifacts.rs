//! Writing traces, logs and graphs to disk.
//!
//! Artifacts of one run share an index: `<file>_<index>.txt`,
//! `<file>_<index>.trace.xml`, `<file>_<index>.dgml` and
//! `<file>_<index>.schedule`. The index is one past the highest index already
//! present in the directory, so repeated runs never overwrite each other.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::engine::BugFindingEngine;
use crate::error::ExploreError;

const ARTIFACT_NAME: &str = r"^(.*)_([0-9]+)_([0-9]+)";

/// Computes the next free artifact index for `file` in `dir`.
///
/// Only entries whose name starts with `file` and looks like
/// `<name>_<run>_<index>` count; anything else is ignored. An empty directory
/// yields 0.
pub fn next_artifact_index(dir: impl AsRef<Path>, file: &str) -> io::Result<u64> {
    let pattern = Regex::new(ARTIFACT_NAME).map_err(io::Error::other)?;
    let mut index = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(file) {
            continue;
        }
        if let Some(value) = pattern
            .captures(name)
            .and_then(|captures| captures[3].parse::<u64>().ok())
        {
            index = index.max(value.saturating_add(1));
        }
    }
    Ok(index)
}

impl BugFindingEngine {
    /// Writes the artifacts of this exploration into `dir`.
    ///
    /// # Returns
    ///
    /// The paths written, in emission order.
    pub fn try_emit_traces(
        &mut self,
        dir: impl AsRef<Path>,
        file: &str,
    ) -> Result<Vec<PathBuf>, ExploreError> {
        let dir = dir.as_ref();
        let index = next_artifact_index(dir, file)?;
        let path = |extension: &str| dir.join(format!("{file}_{index}.{extension}"));
        let mut written = Vec::new();

        if !self.config.full_exploration && !self.readable_trace.is_empty() {
            let target = path("txt");
            self.logger
                .write_line(&format!("..... Writing {}", target.display()));
            fs::write(&target, &self.readable_trace)?;
            written.push(target);
        }

        if self.config.xml_log {
            let target = path("trace.xml");
            self.logger
                .write_line(&format!("..... Writing {}", target.display()));
            fs::write(&target, &self.xml_log)?;
            written.push(target);
        }

        if let Some(graph) = &self.graph {
            let target = path("dgml");
            graph.save_dgml(&target)?;
            self.logger
                .write_line(&format!("..... Writing {}", target.display()));
            written.push(target);
        }

        if !self.config.full_exploration && !self.reproducible_trace.is_empty() {
            let target = path("schedule");
            self.logger
                .write_line(&format!("..... Writing {}", target.display()));
            fs::write(&target, &self.reproducible_trace)?;
            written.push(target);
        }

        self.logger.write_line(&format!(
            "... Elapsed {:.2} sec.",
            self.started.elapsed().as_secs_f64()
        ));
        tracing::info!(count = written.len(), dir = %dir.display(), "artifacts written");

        Ok(written)
    }
}
