//! Processed-id ledger
//!
//! One JSON file per reviewer category, `{"<category>": ["id", ...]}`.
//! Ids are only ever added.
//!
//! Reads fail open: a missing or corrupt ledger is treated as empty, which
//! at worst re-serves a row whose result is already saved. Appends are
//! durable or fail; a failed append must fail the enclosing submit.

use std::collections::HashSet;
use std::path::Path;

use hhv_common::config::DataPaths;
use hhv_common::fsutil::{read_if_exists, with_path_lock, write_atomic};
use hhv_common::{ReviewerCategory, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Durable per-category set of validated row ids
#[derive(Debug, Clone)]
pub struct ProcessedLedger {
    paths: DataPaths,
}

impl ProcessedLedger {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }

    /// All ids recorded for `category`; empty on a missing or unreadable ledger
    pub fn load(&self, category: ReviewerCategory) -> HashSet<String> {
        let path = self.paths.ledger_file(category);
        read_document(&path)
            .map(|doc| ids_in(&doc, category).into_iter().collect())
            .unwrap_or_default()
    }

    /// Number of ids recorded for `category`
    pub fn len(&self, category: ReviewerCategory) -> usize {
        self.load(category).len()
    }

    /// Record `id` as processed for `category`
    ///
    /// Returns `false` if the id was already present (nothing written).
    /// The full updated ledger replaces the old file via temp file + rename;
    /// on failure the old ledger is left untouched and the error returned.
    pub fn append(&self, category: ReviewerCategory, id: &str) -> Result<bool> {
        let path = self.paths.ledger_file(category);

        with_path_lock(&path, || {
            let mut doc = read_document(&path).unwrap_or_default();
            let mut ids = ids_in(&doc, category);

            if ids.iter().any(|existing| existing == id) {
                debug!(category = %category, id = %id, "Id already in ledger");
                return Ok(false);
            }

            ids.push(id.to_string());
            doc.insert(
                category.as_str().to_string(),
                Value::Array(ids.into_iter().map(Value::String).collect()),
            );

            let body = serde_json::to_string_pretty(&Value::Object(doc))?;
            write_atomic(&path, body.as_bytes())?;
            debug!(category = %category, id = %id, "Id appended to ledger");
            Ok(true)
        })
    }
}

/// Parse the ledger file into its top-level object
///
/// Returns `None` (after logging) when the file is missing, unreadable, or
/// not a JSON object.
fn read_document(path: &Path) -> Option<Map<String, Value>> {
    let content = match read_if_exists(path) {
        Ok(Some(content)) => content,
        Ok(None) => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ledger unreadable, treating as empty");
            return None;
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            warn!(path = %path.display(), "Ledger is not a JSON object, treating as empty");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ledger corrupt, treating as empty");
            None
        }
    }
}

/// String ids under the category key, in file order, without duplicates
fn ids_in(doc: &Map<String, Value>, category: ReviewerCategory) -> Vec<String> {
    let mut seen = HashSet::new();
    doc.get(category.as_str())
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|id| seen.insert(id.to_string()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
