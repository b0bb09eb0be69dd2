//! Review sources.
//!
//! A review source turns an instructor name into the raw JSON record for
//! that instructor. Fetched records are stored as-is under the raw data
//! directory so later stages can be re-run without fetching again.

use crate::models::{query_name, RawReviewRecord};
use crate::storage::{raw_file_name, OutputDir};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Placeholder in a source URL template replaced by the query name.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Something that can deliver the raw review record for an instructor.
#[allow(async_fn_in_trait)]
pub trait ReviewSource {
    /// Fetch the raw JSON document for `instructor`.
    async fn fetch(&self, instructor: &str) -> Result<Value>;
}

/// Review source reached over HTTP GET.
pub struct HttpReviewSource {
    url_template: String,
    http_client: reqwest::Client,
}

impl HttpReviewSource {
    /// Create a source from a URL template containing `{query}`.
    pub fn new(url_template: &str, timeout_seconds: u64) -> Result<Self> {
        if !url_template.contains(QUERY_PLACEHOLDER) {
            anyhow::bail!(
                "Review source URL template must contain {}: {}",
                QUERY_PLACEHOLDER,
                url_template
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            url_template: url_template.to_string(),
            http_client,
        })
    }

    /// URL for one instructor.
    pub fn url_for(&self, instructor: &str) -> String {
        self.url_template
            .replace(QUERY_PLACEHOLDER, &query_name(instructor))
    }
}

impl ReviewSource for HttpReviewSource {
    async fn fetch(&self, instructor: &str) -> Result<Value> {
        let url = self.url_for(instructor);
        debug!("Fetching reviews from {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch reviews for {}", instructor))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Review source returned {} for {}",
                response.status(),
                instructor
            );
        }

        response
            .json()
            .await
            .with_context(|| format!("Review source sent invalid JSON for {}", instructor))
    }
}

/// Row of a name queue CSV.
#[derive(Debug, Deserialize)]
struct NameRow {
    first_name: String,
    last_name: String,
}

/// Load instructor names from a CSV with `first_name,last_name` columns.
pub fn load_name_queue(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open name queue: {}", path.display()))?;

    let mut names = Vec::new();
    for row in reader.deserialize::<NameRow>() {
        let row = row.with_context(|| format!("Invalid row in {}", path.display()))?;
        let name = format!("{} {}", row.first_name.trim(), row.last_name.trim());
        names.push(name.trim().to_string());
    }

    Ok(names)
}

/// Fetch one instructor and store the raw document as `<slug>.json`.
pub async fn fetch_and_store<S: ReviewSource>(
    source: &S,
    instructor: &str,
    raw_dir: &OutputDir,
) -> Result<PathBuf> {
    let document = source.fetch(instructor).await?;
    let record = RawReviewRecord::from_document(&document)
        .with_context(|| format!("Unexpected review record shape for {}", instructor))?;

    let path = raw_dir.write_json(&raw_file_name(instructor), &document)?;
    info!(
        "Fetched {} reviews for {} into {}",
        record.reviews.len(),
        instructor,
        path.display()
    );

    Ok(path)
}

/// Results of fetching a queue of instructors.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub fetched: Vec<PathBuf>,
    pub failed: Vec<(String, String)>,
}

/// Fetch every instructor in `names`; one failure does not stop the queue.
pub async fn fetch_all<S: ReviewSource>(
    source: &S,
    names: &[String],
    raw_dir: &OutputDir,
) -> FetchReport {
    let mut report = FetchReport::default();

    for name in names {
        match fetch_and_store(source, name, raw_dir).await {
            Ok(path) => report.fetched.push(path),
            Err(e) => {
                warn!("Failed to fetch reviews for {}: {:#}", name, e);
                report.failed.push((name.clone(), format!("{:#}", e)));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    struct StubSource;

    impl ReviewSource for StubSource {
        async fn fetch(&self, instructor: &str) -> Result<Value> {
            match instructor {
                "Aric Grossman" => Ok(json!({
                    "name": "Aric Grossman",
                    "courses": ["CS101"],
                    "reviews": [{"course": "CS101", "rating": 5, "review": "Great"}],
                    "source_id": 42
                })),
                "List Shaped" => Ok(json!([1, 2, 3])),
                _ => anyhow::bail!("not found"),
            }
        }
    }

    #[test]
    fn test_url_template() {
        let source =
            HttpReviewSource::new("https://reviews.example.edu/api?prof={query}", 10).unwrap();
        assert_eq!(
            source.url_for("Aric Grossman"),
            "https://reviews.example.edu/api?prof=Aric+Grossman"
        );
    }

    #[test]
    fn test_url_template_requires_placeholder() {
        assert!(HttpReviewSource::new("https://reviews.example.edu/api", 10).is_err());
    }

    #[test]
    fn test_load_name_queue() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("names.csv");
        std::fs::write(&path, "first_name,last_name\nAric,Grossman\n Ada , Lovelace \n").unwrap();

        let names = load_name_queue(&path).unwrap();
        assert_eq!(names, vec!["Aric Grossman", "Ada Lovelace"]);
    }

    #[test]
    fn test_fetch_stores_raw_document_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        let raw_dir = OutputDir::acquire(temp_dir.path().join("raw")).unwrap();

        let path =
            tokio_test::block_on(fetch_and_store(&StubSource, "Aric Grossman", &raw_dir)).unwrap();

        assert!(path.ends_with("Aric_Grossman.json"));
        let stored: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored["source_id"], 42);
    }

    #[test]
    fn test_fetch_all_continues_past_failures() {
        let temp_dir = TempDir::new().unwrap();
        let raw_dir = OutputDir::acquire(temp_dir.path()).unwrap();
        let names = vec![
            "Nobody Here".to_string(),
            "List Shaped".to_string(),
            "Aric Grossman".to_string(),
        ];

        let report = tokio_test::block_on(fetch_all(&StubSource, &names, &raw_dir));

        assert_eq!(report.fetched.len(), 1);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].0, "Nobody Here");
    }
}
