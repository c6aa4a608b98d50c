//! Result sink
//!
//! Per-folder JSONL log of validated results, at most one live entry per
//! id. Saving an id that is already present replaces the earlier entry
//! (last write wins). Lines that cannot be parsed are kept as they are.

use hhv_common::config::DataPaths;
use hhv_common::fsutil::{read_bytes_if_exists, with_path_lock, write_atomic};
use hhv_common::jsonl;
use hhv_common::{Result, ValidationResult};
use serde::Deserialize;
use tracing::{info, warn};

/// Only the id is needed to decide whether an existing line is superseded
#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

/// Durable per-folder log of validated results
#[derive(Debug, Clone)]
pub struct ResultSink {
    paths: DataPaths,
}

impl ResultSink {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }

    /// Write `result` into `folder`'s log, superseding any entry with the same id
    ///
    /// The log is handled as raw bytes; lines that are not UTF-8 or not JSON
    /// are carried over unchanged.
    pub fn save(&self, result: &ValidationResult, folder: &str) -> Result<()> {
        let path = self.paths.validated_file(folder);
        let new_line = serde_json::to_vec(result)?;

        with_path_lock(&path, || {
            let existing = read_bytes_if_exists(&path)?.unwrap_or_default();

            let mut superseded = 0usize;
            let mut kept: Vec<&[u8]> = Vec::new();
            for (_, line) in jsonl::byte_lines(&existing) {
                match serde_json::from_slice::<IdOnly>(line) {
                    Ok(entry) if entry.id == result.id => superseded += 1,
                    _ => kept.push(line),
                }
            }
            kept.push(&new_line);

            write_atomic(&path, &jsonl::join_lines(&kept))?;

            if superseded > 0 {
                info!(folder = %folder, id = %result.id, "Validated result replaced earlier submission");
            } else {
                info!(folder = %folder, id = %result.id, "Validated result saved");
            }
            Ok(())
        })
    }

    /// Parsed entries of `folder`'s log in file order; unparseable lines are skipped
    pub fn entries(&self, folder: &str) -> Result<Vec<ValidationResult>> {
        let path = self.paths.validated_file(folder);
        let content = read_bytes_if_exists(&path)?.unwrap_or_default();

        Ok(jsonl::byte_lines(&content)
            .filter_map(|(line_no, line)| match serde_json::from_slice::<ValidationResult>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(folder = %folder, line = line_no, error = %e, "Failed to parse result line");
                    None
                }
            })
            .collect())
    }
}
