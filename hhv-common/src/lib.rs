//! # HHV Common Library
//!
//! Shared code for the HH validation tools including:
//! - Dataset row and validated result models
//! - Reviewer categories and folder configuration
//! - Configuration loading
//! - JSONL helpers and atomic file replacement
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod fsutil;
pub mod jsonl;
pub mod model;
pub mod time;

pub use error::{Error, Result};
pub use model::{DataRow, ReviewerCategory, ValidationResult};
