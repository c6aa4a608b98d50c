//! Merge refined annotations with original conversations
//!
//! Annotations (`<refined>/<name>/train.json`, a JSON array) carry the
//! machine-generated ofnr/metadata/safety/quality/flags. Originals
//! (`<data>/<original_folder>/<original_file>`, JSONL) carry the prompt,
//! context and responses. Records are joined on the normalized id and the
//! merged rows written to `<refined>/<name>/train.jsonl`.
//!
//! Only annotated rows are emitted, so re-running after more annotations
//! arrive regenerates the full partition.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use hhv_common::config::{is_valid_folder_name, PARTITION_FILE};
use hhv_common::fsutil::write_atomic;
use hhv_common::jsonl::{lines, to_jsonl};
use hhv_common::{Error, Result};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Annotation file name inside each refined dataset folder
pub const ANNOTATION_FILE: &str = "train.json";

/// Fields taken from the original record, empty string when absent
const ORIGINAL_FIELDS: [&str; 4] = [
    "prompt",
    "context",
    "human_chosen_response",
    "human_rejected_response",
];

/// Fields taken from the annotation, only when present
const ANNOTATION_FIELDS: [&str; 5] = ["ofnr", "metadata", "safety", "quality", "flags"];

/// Number of missing ids listed in a report
pub const MISSING_PREVIEW: usize = 5;

/// One dataset to merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    /// Folder under the refined directory (annotations in, merged rows out)
    pub name: String,
    /// Folder under the data directory holding the originals
    pub original_folder: String,
    /// Originals file name inside `original_folder`
    pub original_file: String,
}

impl DatasetSpec {
    pub fn new(name: &str, original_folder: &str, original_file: &str) -> Self {
        Self {
            name: name.to_string(),
            original_folder: original_folder.to_string(),
            original_file: original_file.to_string(),
        }
    }

    /// Datasets whose annotations ship without conversation text
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("helpful-online", "helpful-online", PARTITION_FILE),
            Self::new(
                "helpful-rejections-sampled",
                "helpful-rejection-sampled",
                PARTITION_FILE,
            ),
            Self::new(
                "red-team-attempts",
                "red-team-attempts",
                "red_team_attempts.jsonl",
            ),
        ]
    }
}

/// Parses `name[:original_folder[:original_file]]`
///
/// The original folder defaults to `name` and the file to `train.jsonl`.
impl FromStr for DatasetSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        let name = parts.next().unwrap_or_default();
        let original_folder = parts.next().filter(|p| !p.is_empty()).unwrap_or(name);
        let original_file = parts
            .next()
            .filter(|p| !p.is_empty())
            .unwrap_or(PARTITION_FILE);

        if parts.next().is_some() {
            return Err(Error::InvalidInput(format!(
                "Too many ':' in dataset '{}', expected name[:original_folder[:original_file]]",
                s
            )));
        }
        for part in [name, original_folder, original_file] {
            if !is_valid_folder_name(part) {
                return Err(Error::InvalidInput(format!(
                    "Invalid path component '{}' in dataset '{}'",
                    part, s
                )));
            }
        }

        Ok(Self::new(name, original_folder, original_file))
    }
}

/// Outcome of merging one dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub name: String,
    /// Merged file, if one was written
    pub output: Option<PathBuf>,
    pub merged: usize,
    /// Annotation ids with no original record, in annotation order
    pub missing: Vec<String>,
    /// An input file was absent and the dataset was not processed
    pub skipped: bool,
}

/// Zero-pad the numeric suffix of `prefix_digits` ids to six digits
///
/// `red_team_attempts_00100` becomes `red_team_attempts_000100`. Longer
/// suffixes keep their significant digits. Ids without that shape are
/// returned unchanged.
pub fn normalize_id(id: &str) -> String {
    let Some(split) = id.rfind('_') else {
        return id.to_string();
    };
    let (prefix, digits) = id.split_at(split + 1);

    if split == 0 || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return id.to_string();
    }

    let significant = digits.trim_start_matches('0');
    let significant = if significant.is_empty() { "0" } else { significant };
    format!("{}{:0>6}", prefix, significant)
}

/// Join annotations with originals by normalized id
///
/// Returns the merged rows in annotation order and the ids of annotations
/// with no matching original. When several originals share a normalized
/// id the last one wins.
pub fn merge_records(annotations: &[Value], originals: &[Value]) -> (Vec<Value>, Vec<String>) {
    let mut by_id: HashMap<String, &Map<String, Value>> = HashMap::new();
    for original in originals {
        match record_id(original) {
            Some((id, record)) => {
                by_id.insert(normalize_id(id), record);
            }
            None => warn!("Original record without string id skipped"),
        }
    }

    let mut merged = Vec::new();
    let mut missing = Vec::new();

    for annotation in annotations {
        let Some((id, fields)) = record_id(annotation) else {
            warn!("Annotation without string id skipped");
            continue;
        };
        let normalized = normalize_id(id);

        let Some(original) = by_id.get(&normalized) else {
            missing.push(id.to_string());
            continue;
        };

        let mut row = Map::new();
        row.insert("id".to_string(), Value::String(normalized));
        for key in ORIGINAL_FIELDS {
            let value = original
                .get(key)
                .cloned()
                .unwrap_or_else(|| Value::String(String::new()));
            row.insert(key.to_string(), value);
        }
        for key in ANNOTATION_FIELDS {
            if let Some(value) = fields.get(key) {
                row.insert(key.to_string(), value.clone());
            }
        }
        merged.push(Value::Object(row));
    }

    (merged, missing)
}

/// Merge one dataset on disk
///
/// A missing annotation or originals file skips the dataset with a warning.
/// The output is only written when at least one row merged.
pub fn merge_dataset(data_dir: &Path, refined_dir: &Path, dataset: &DatasetSpec) -> Result<MergeReport> {
    let annotations_path = refined_dir.join(&dataset.name).join(ANNOTATION_FILE);
    let originals_path = data_dir
        .join(&dataset.original_folder)
        .join(&dataset.original_file);
    let output_path = refined_dir.join(&dataset.name).join(PARTITION_FILE);

    let mut report = MergeReport {
        name: dataset.name.clone(),
        ..MergeReport::default()
    };

    for path in [&annotations_path, &originals_path] {
        if !path.exists() {
            warn!(dataset = %dataset.name, path = %path.display(), "Input not found, skipping dataset");
            report.skipped = true;
            return Ok(report);
        }
    }

    let annotations = load_json_array(&annotations_path)?;
    info!(dataset = %dataset.name, count = annotations.len(), "Loaded annotations");

    let originals = load_jsonl(&originals_path)?;
    info!(dataset = %dataset.name, count = originals.len(), "Loaded original records");

    let (merged, missing) = merge_records(&annotations, &originals);

    if !merged.is_empty() {
        write_atomic(&output_path, to_jsonl(&merged)?.as_bytes())?;
        info!(
            dataset = %dataset.name,
            count = merged.len(),
            path = %output_path.display(),
            "Saved merged records"
        );
        report.output = Some(output_path);
    }
    if !missing.is_empty() {
        warn!(
            dataset = %dataset.name,
            count = missing.len(),
            "Annotation ids not found in original data"
        );
    }

    report.merged = merged.len();
    report.missing = missing;
    Ok(report)
}

fn record_id(value: &Value) -> Option<(&str, &Map<String, Value>)> {
    let record = value.as_object()?;
    let id = record.get("id")?.as_str()?;
    Some((id, record))
}

fn load_json_array(path: &Path) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(&fs::read_to_string(path)?)? {
        Value::Array(items) => Ok(items),
        _ => Err(Error::InvalidInput(format!(
            "{} must contain a JSON array",
            path.display()
        ))),
    }
}

fn load_jsonl(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)?;
    lines(&content)
        .map(|(line_no, line)| {
            serde_json::from_str(line).map_err(|e| {
                Error::InvalidInput(format!("{} line {}: {}", path.display(), line_no, e))
            })
        })
        .collect()
}
