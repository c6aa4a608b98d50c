//! Validation engine
//!
//! Ties the record store, ledger, sink and selector together behind the two
//! operations the review UI needs: fetch the next row and submit a result.

use hhv_common::config::{DataPaths, FolderLayout};
use hhv_common::{DataRow, ReviewerCategory, Result, ValidationResult};
use serde::Serialize;
use tracing::{error, info};

use crate::ledger::ProcessedLedger;
use crate::selector::{RowSelector, Selection};
use crate::sink::ResultSink;
use crate::store::RecordStore;

/// Response body of a fetch: the row to review (if any) and the work left
#[derive(Debug, Clone, Serialize)]
pub struct RowFetch {
    pub row: Option<DataRow>,
    pub folder: Option<String>,
    pub remaining: usize,
}

pub struct ValidationEngine {
    store: RecordStore,
    ledger: ProcessedLedger,
    sink: ResultSink,
    selector: RowSelector,
}

impl ValidationEngine {
    pub fn new(paths: DataPaths, folders: FolderLayout) -> Self {
        let store = RecordStore::new(paths.clone());
        let ledger = ProcessedLedger::new(paths.clone());
        let selector = RowSelector::new(store.clone(), ledger.clone(), folders);
        Self {
            store,
            ledger,
            sink: ResultSink::new(paths),
            selector,
        }
    }

    pub fn folders(&self) -> &FolderLayout {
        self.selector.folders()
    }

    pub fn selector(&self) -> &RowSelector {
        &self.selector
    }

    pub fn sink(&self) -> &ResultSink {
        &self.sink
    }

    pub fn ledger(&self) -> &ProcessedLedger {
        &self.ledger
    }

    /// Next row for `category` plus the remaining count
    pub fn fetch_next(&self, category: ReviewerCategory) -> Result<RowFetch> {
        let selection = self.selector.next_for_category(category)?;
        let remaining = self.selector.remaining_count(category)?;

        Ok(match selection {
            Some(Selection { row, folder }) => RowFetch {
                row: Some(row),
                folder: Some(folder),
                remaining,
            },
            None => RowFetch {
                row: None,
                folder: None,
                remaining,
            },
        })
    }

    /// Source row `id` in `folder`, if present
    pub fn source_row(&self, folder: &str, id: &str) -> Result<Option<DataRow>> {
        self.store.find_by_id(folder, id)
    }

    /// Persist a validated result and mark its id processed
    ///
    /// The sink write happens first; the id is only marked processed once
    /// the result is durable. If the process dies in between, the row may be
    /// served again and the resubmission replaces the saved entry.
    pub fn submit(&self, result: &ValidationResult, folder: &str) -> Result<()> {
        if let Err(e) = self.sink.save(result, folder) {
            error!(folder = %folder, id = %result.id, error = %e, "Failed to save validated result");
            return Err(e);
        }

        if let Err(e) = self.ledger.append(result.validator_type, &result.id) {
            error!(
                category = %result.validator_type,
                id = %result.id,
                error = %e,
                "Result saved but id not marked processed"
            );
            return Err(e);
        }

        info!(
            category = %result.validator_type,
            folder = %folder,
            id = %result.id,
            "Submission recorded"
        );
        Ok(())
    }
}
