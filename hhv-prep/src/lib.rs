//! hhv-prep library - offline preparation of source partitions
//!
//! Produces the `train.jsonl` files the review service reads:
//! - [`convert`]: JSON array file to JSONL
//! - [`merge`]: join refined annotations with the original conversations

pub mod convert;
pub mod merge;

pub use crate::convert::{convert_file, ConvertReport};
pub use crate::merge::{merge_dataset, normalize_id, DatasetSpec, MergeReport};
