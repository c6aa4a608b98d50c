//! JSON array to JSONL conversion

use std::fs;
use std::path::{Path, PathBuf};

use hhv_common::fsutil::write_atomic;
use hhv_common::jsonl::to_jsonl;
use hhv_common::{Error, Result};
use serde_json::Value;
use tracing::info;

/// Outcome of one conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub count: usize,
}

/// Output path used when none is given: the input with a `.jsonl` extension
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("jsonl")
}

/// Encode a JSON array document as JSONL, returning the body and item count
pub fn array_to_jsonl(content: &str) -> Result<(String, usize)> {
    let items = match serde_json::from_str::<Value>(content)? {
        Value::Array(items) => items,
        _ => return Err(Error::InvalidInput("Input JSON must be an array".to_string())),
    };
    Ok((to_jsonl(&items)?, items.len()))
}

/// Convert the JSON array file at `input` into a JSONL file
pub fn convert_file(input: &Path, output: Option<&Path>) -> Result<ConvertReport> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input));

    info!(path = %input.display(), "Reading");
    let content = fs::read_to_string(input)?;
    let (body, count) = array_to_jsonl(&content)?;

    info!(path = %output.display(), "Writing");
    write_atomic(&output, body.as_bytes())?;

    Ok(ConvertReport {
        input: input.to_path_buf(),
        output,
        count,
    })
}
