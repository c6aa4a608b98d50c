//! Record store
//!
//! Reads the source tree of JSONL partitions. Each line is parsed on its
//! own; a line that is not a JSON object with a string `id` is logged and
//! skipped. A missing partition file behaves like an empty folder.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Lines};
use std::path::PathBuf;

use hhv_common::config::DataPaths;
use hhv_common::{DataRow, Result};
use tracing::{debug, warn};

/// Read-only access to source partitions
#[derive(Debug, Clone)]
pub struct RecordStore {
    paths: DataPaths,
}

impl RecordStore {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }

    /// Lazily iterate the rows of a folder in file order
    ///
    /// Returns an empty scan if the folder's partition file does not exist.
    /// Other open failures are returned as errors.
    pub fn scan_folder(&self, folder: &str) -> Result<FolderScan> {
        let path = self.paths.source_file(folder);
        match File::open(&path) {
            Ok(file) => {
                debug!(folder = %folder, path = %path.display(), "Scanning folder");
                Ok(FolderScan {
                    folder: folder.to_string(),
                    path,
                    lines: Some(BufReader::new(file).lines()),
                    line_no: 0,
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(folder = %folder, path = %path.display(), "File not found");
                Ok(FolderScan {
                    folder: folder.to_string(),
                    path,
                    lines: None,
                    line_no: 0,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// First row in file order whose id is not in `exclude`
    pub fn find_unprocessed(
        &self,
        folder: &str,
        exclude: &HashSet<String>,
    ) -> Result<Option<DataRow>> {
        Ok(self
            .scan_folder(folder)?
            .find(|row| !exclude.contains(&row.id)))
    }

    /// Number of rows in a folder whose id is not in `exclude`
    pub fn count_unprocessed(&self, folder: &str, exclude: &HashSet<String>) -> Result<usize> {
        Ok(self
            .scan_folder(folder)?
            .filter(|row| !exclude.contains(&row.id))
            .count())
    }

    /// First row in a folder with the given id
    pub fn find_by_id(&self, folder: &str, id: &str) -> Result<Option<DataRow>> {
        Ok(self.scan_folder(folder)?.find(|row| row.id == id))
    }
}

/// Iterator over the parseable rows of one partition file
pub struct FolderScan {
    folder: String,
    path: PathBuf,
    lines: Option<Lines<BufReader<File>>>,
    line_no: usize,
}

impl Iterator for FolderScan {
    type Item = DataRow;

    fn next(&mut self) -> Option<DataRow> {
        loop {
            let line = match self.lines.as_mut()?.next()? {
                Ok(line) => line,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    self.line_no += 1;
                    warn!(
                        folder = %self.folder,
                        line = self.line_no,
                        "Skipping line with invalid UTF-8"
                    );
                    continue;
                }
                Err(e) => {
                    warn!(
                        folder = %self.folder,
                        path = %self.path.display(),
                        error = %e,
                        "Read failed, ending scan"
                    );
                    self.lines = None;
                    return None;
                }
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<DataRow>(trimmed) {
                Ok(row) => return Some(row),
                Err(e) => {
                    warn!(
                        folder = %self.folder,
                        line = self.line_no,
                        error = %e,
                        "Failed to parse line"
                    );
                }
            }
        }
    }
}
