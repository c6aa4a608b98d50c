//! Row selector
//!
//! Decides which folder and row to serve next for a reviewer category.
//! Each category rotates over its configured folders starting at a cursor;
//! the first folder that still has an unprocessed row wins and the cursor
//! moves to the folder after it. With a single folder (lawyers) this is a
//! plain scan of that folder.
//!
//! Cursors live in memory only and start at the first folder on every
//! process start.

use std::sync::{Mutex, MutexGuard};

use hhv_common::config::FolderLayout;
use hhv_common::{DataRow, ReviewerCategory, Result};
use tracing::debug;

use crate::ledger::ProcessedLedger;
use crate::store::RecordStore;

/// A row chosen for review together with its source folder
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub row: DataRow,
    pub folder: String,
}

/// Round-robin position for one category
///
/// Held for the whole scan-and-advance of a fetch, so concurrent fetches in
/// the same category take turns.
#[derive(Debug, Default)]
struct Cursor(Mutex<usize>);

impl Cursor {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub struct RowSelector {
    store: RecordStore,
    ledger: ProcessedLedger,
    folders: FolderLayout,
    general: Cursor,
    lawyers: Cursor,
}

impl RowSelector {
    pub fn new(store: RecordStore, ledger: ProcessedLedger, folders: FolderLayout) -> Self {
        Self {
            store,
            ledger,
            folders,
            general: Cursor::default(),
            lawyers: Cursor::default(),
        }
    }

    fn cursor(&self, category: ReviewerCategory) -> &Cursor {
        match category {
            ReviewerCategory::General => &self.general,
            ReviewerCategory::Lawyers => &self.lawyers,
        }
    }

    /// Index of the folder the next fetch for `category` tries first
    pub fn cursor_position(&self, category: ReviewerCategory) -> usize {
        *self.cursor(category).lock()
    }

    pub fn folders(&self) -> &FolderLayout {
        &self.folders
    }

    /// Next unprocessed row for `category`, or `None` when every folder is exhausted
    ///
    /// The cursor only moves on a hit.
    pub fn next_for_category(&self, category: ReviewerCategory) -> Result<Option<Selection>> {
        let folders = self.folders.folders(category);
        if folders.is_empty() {
            return Ok(None);
        }

        let mut cursor = self.cursor(category).lock();
        let processed = self.ledger.load(category);
        let start = *cursor % folders.len();

        for offset in 0..folders.len() {
            let idx = (start + offset) % folders.len();
            let folder = &folders[idx];

            if let Some(row) = self.store.find_unprocessed(folder, &processed)? {
                *cursor = (idx + 1) % folders.len();
                debug!(
                    category = %category,
                    folder = %folder,
                    id = %row.id,
                    "Selected row"
                );
                return Ok(Some(Selection {
                    row,
                    folder: folder.clone(),
                }));
            }
        }

        debug!(category = %category, "All folders exhausted");
        Ok(None)
    }

    /// Unprocessed rows across all of `category`'s folders
    ///
    /// Full rescan on every call.
    pub fn remaining_count(&self, category: ReviewerCategory) -> Result<usize> {
        let processed = self.ledger.load(category);
        let mut count = 0;
        for folder in self.folders.folders(category) {
            count += self.store.count_unprocessed(folder, &processed)?;
        }
        Ok(count)
    }
}
