//! Input discovery for batch runs.
//!
//! Lists the eligible documents in a pipeline directory: regular files
//! with the configured extension, directly inside the directory, sorted
//! by file name so batch order is reproducible.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Configuration for input discovery.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extension to include (without dot).
    pub extension: String,
    /// Skip dot-files such as editor swap files.
    pub skip_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extension: "json".to_string(),
            skip_hidden: true,
        }
    }
}

/// Scanner for the documents in one pipeline directory.
pub struct InputScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl InputScanner {
    /// Create a new scanner over `root`.
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// Scan for all eligible files.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            anyhow::bail!("Input directory not found: {}", self.root.display());
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", self.root.display(), e);
                    continue;
                }
            };

            if entry.file_type().is_file() && self.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }

        debug!("Found {} input files in {}", files.len(), self.root.display());
        Ok(files)
    }

    /// Check whether a path is an eligible input.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if self.config.skip_hidden && name.starts_with('.') {
            return false;
        }

        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(&self.config.extension))
            .unwrap_or(false)
    }
}

/// Scan `dir` with the default configuration.
pub fn json_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    InputScanner::new(dir.to_path_buf(), ScanConfig::default())
        .scan()
        .with_context(|| format!("Failed to list inputs in {}", dir.display()))
}
