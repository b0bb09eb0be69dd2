//! Prepare stage: raw records to preprocessed documents.
//!
//! Reads `<raw_dir>/<stem>.json` and writes either the instructor aggregate
//! (`<stem>_llm.json`) or the legacy cleaned review list (`<stem>.json`)
//! into the preprocessed directory.

use crate::analysis::{build_aggregate, untaught_review_count};
use crate::cleaner::clean_record;
use crate::models::{display_name_from_stem, RawReviewRecord};
use crate::storage::{aggregate_file_name, file_stem, legacy_file_name, OutputDir};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Which preprocessed shape to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrepareMode {
    /// Per-course statistics plus merged corpus.
    #[default]
    Aggregate,
    /// `{professor, reviews}` with cleaned review bodies.
    Legacy,
}

/// Results of preparing a directory of raw records.
#[derive(Debug, Default)]
pub struct PrepareReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Load a raw record from disk.
pub fn load_raw_record(path: &Path) -> Result<RawReviewRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let document: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    RawReviewRecord::from_document(&document)
        .with_context(|| format!("Unexpected record shape in {}", path.display()))
}

/// Prepare one raw file, returning the written path.
pub fn prepare_file(raw_path: &Path, output: &OutputDir, mode: PrepareMode) -> Result<PathBuf> {
    let record = load_raw_record(raw_path)?;
    let stem = file_stem(raw_path)?;

    match mode {
        PrepareMode::Aggregate => {
            let name = record
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .unwrap_or_else(|| display_name_from_stem(stem));

            let dropped = untaught_review_count(&record);
            if dropped > 0 {
                warn!(
                    "{}: {} review(s) reference courses missing from the taught list and are not counted per course",
                    name, dropped
                );
            }

            let aggregate = build_aggregate(&name, &record);
            output.write_json(&aggregate_file_name(stem), &aggregate)
        }
        PrepareMode::Legacy => {
            let cleaned = clean_record(&record);
            output.write_json(&legacy_file_name(stem), &cleaned)
        }
    }
}

/// Prepare every raw file in order; one failure does not stop the rest.
pub fn prepare_all(raw_files: &[PathBuf], output: &OutputDir, mode: PrepareMode) -> PrepareReport {
    let mut report = PrepareReport::default();
    debug!(
        "Preparing {} raw record(s) into {}",
        raw_files.len(),
        output.path().display()
    );

    for raw_path in raw_files {
        match prepare_file(raw_path, output, mode) {
            Ok(path) => {
                info!("Prepared {}", path.display());
                report.written.push(path);
            }
            Err(e) => {
                error!("Failed to prepare {}: {:#}", raw_path.display(), e);
                report.failed.push((raw_path.clone(), format!("{:#}", e)));
            }
        }
    }

    report
}
