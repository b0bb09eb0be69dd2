//! Flat-file persistence for pipeline outputs.
//!
//! Every stage writes one JSON document per instructor into a directory
//! obtained through [`OutputDir::acquire`]. Writes replace any existing file
//! at the target path, so re-running a stage never accumulates copies.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::models::instructor_slug;

/// Suffix appended to a raw file stem for the aggregate document.
pub const AGGREGATE_SUFFIX: &str = "_llm";

/// Suffix appended to a preprocessed file stem for the summary document.
pub const SUMMARY_SUFFIX: &str = "_summary";

/// Mode of every written document. Staging files start owner-only.
#[cfg(unix)]
pub const OUTPUT_FILE_MODE: u32 = 0o644;

/// A directory that is known to exist and can be written into.
#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    /// Create the directory (and parents) if needed and hand back a guard
    /// for writing into it.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create output directory: {}", path.display()))?;

        if !path.is_dir() {
            anyhow::bail!("Output path is not a directory: {}", path.display());
        }

        Ok(Self { path })
    }

    /// Path of the acquired directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `value` as pretty JSON to `file_name`, replacing any
    /// existing file. The document is written to a temporary file in the
    /// same directory and renamed over the target.
    pub fn write_json<T: Serialize + ?Sized>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        let target = self.path.join(file_name);

        let mut content = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to serialize {}", file_name))?;
        content.push('\n');

        let mut staging = NamedTempFile::new_in(&self.path).with_context(|| {
            format!("Failed to create temporary file in {}", self.path.display())
        })?;
        staging
            .write_all(content.as_bytes())
            .with_context(|| format!("Failed to write {}", target.display()))?;
        make_readable(&staging)?;
        staging
            .persist(&target)
            .with_context(|| format!("Failed to replace {}", target.display()))?;

        debug!("Wrote {} ({} bytes)", target.display(), content.len());
        Ok(target)
    }
}

#[cfg(unix)]
fn make_readable(staging: &NamedTempFile) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    staging
        .as_file()
        .set_permissions(std::fs::Permissions::from_mode(OUTPUT_FILE_MODE))
        .with_context(|| format!("Failed to set permissions on {}", staging.path().display()))
}

#[cfg(not(unix))]
fn make_readable(_staging: &NamedTempFile) -> Result<()> {
    Ok(())
}

/// File name of a raw record: `<slug>.json`.
pub fn raw_file_name(instructor: &str) -> String {
    format!("{}.json", instructor_slug(instructor))
}

/// File name of the legacy cleaned document derived from a raw file stem.
pub fn legacy_file_name(raw_stem: &str) -> String {
    format!("{}.json", raw_stem)
}

/// File name of the aggregate derived from a raw file stem: `<stem>_llm.json`.
pub fn aggregate_file_name(raw_stem: &str) -> String {
    format!("{}{}.json", raw_stem, AGGREGATE_SUFFIX)
}

/// File name of the summary for a preprocessed input:
/// `<stem>_summary.<ext>`, with the input's extension preserved.
pub fn summary_file_name(input: &Path) -> Result<String> {
    let stem = file_stem(input)?;
    let extension = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("json");

    Ok(format!("{}{}.{}", stem, SUMMARY_SUFFIX, extension))
}

/// UTF-8 file stem of `path`.
pub fn file_stem(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("Path has no usable file name: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_creates_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("data").join("summaries");

        let dir = OutputDir::acquire(&nested).unwrap();

        assert!(nested.is_dir());
        assert_eq!(dir.path(), nested.as_path());
    }

    #[test]
    fn test_acquire_fails_on_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("occupied");
        std::fs::write(&file, "not a directory").unwrap();

        assert!(OutputDir::acquire(&file).is_err());
    }

    #[test]
    fn test_write_json_overwrites_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let dir = OutputDir::acquire(temp_dir.path()).unwrap();

        let first = dir.write_json("a_summary.json", &json!({"run": 1})).unwrap();
        let second = dir.write_json("a_summary.json", &json!({"run": 2})).unwrap();

        assert_eq!(first, second);
        let entries = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(entries, 1);

        let content = std::fs::read_to_string(&second).unwrap();
        assert!(content.contains("\"run\": 2"));
    }

    #[cfg(unix)]
    #[test]
    fn test_written_files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let dir = OutputDir::acquire(temp_dir.path()).unwrap();

        let path = dir.write_json("a_llm.json", &json!({"name": "A"})).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);

        let path = dir.write_json("a_llm.json", &json!({"name": "B"})).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn test_write_json_keeps_non_ascii() {
        let temp_dir = TempDir::new().unwrap();
        let dir = OutputDir::acquire(temp_dir.path()).unwrap();

        let path = dir.write_json("x.json", &json!({"name": "José Núñez"})).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("José Núñez"));
    }

    #[test]
    fn test_file_names() {
        assert_eq!(raw_file_name("Aric Grossman"), "Aric_Grossman.json");
        assert_eq!(legacy_file_name("Aric_Grossman"), "Aric_Grossman.json");
        assert_eq!(aggregate_file_name("Aric_Grossman"), "Aric_Grossman_llm.json");
        assert_eq!(
            summary_file_name(Path::new("data/preprocessed/Aric_Grossman_llm.json")).unwrap(),
            "Aric_Grossman_llm_summary.json"
        );
    }
}
