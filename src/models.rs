//! Data models for the review pipeline.
//!
//! This module contains the raw records delivered by a review source,
//! the legacy cleaned shape, and the per-instructor aggregate that is
//! persisted between the prepare and summarize stages.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Opaque course identifier. Compared by exact string equality.
pub type CourseCode = String;

/// Name used when a raw record carries no instructor name.
pub const UNKNOWN_INSTRUCTOR: &str = "Unknown";

/// A single student review as delivered by the review source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    /// Course the review was written for.
    #[serde(default, deserialize_with = "lenient_string")]
    pub course: Option<CourseCode>,
    /// Numeric rating. Anything that is not a JSON number is treated as absent.
    #[serde(default, deserialize_with = "lenient_number")]
    pub rating: Option<f64>,
    /// Free-text review body.
    #[serde(default, deserialize_with = "lenient_string")]
    pub review: Option<String>,
}

impl ReviewEntry {
    /// Returns true if this review was written for `course`.
    pub fn is_for(&self, course: &str) -> bool {
        self.course.as_deref() == Some(course)
    }

    /// Returns the trimmed review body, or `None` if it is missing or blank.
    pub fn trimmed_body(&self) -> Option<&str> {
        self.review
            .as_deref()
            .map(str::trim)
            .filter(|body| !body.is_empty())
    }
}

/// Everything a review source knows about one instructor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReviewRecord {
    /// Instructor name, if the source provided one.
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    /// Course codes taught, one entry per offering (duplicates are meaningful).
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub courses: Vec<CourseCode>,
    /// Reviews in the order the source returned them.
    #[serde(default, deserialize_with = "lenient_reviews")]
    pub reviews: Vec<ReviewEntry>,
}

impl RawReviewRecord {
    /// Interpret a JSON document as a raw record. The document must be an
    /// object; its fields are read leniently.
    pub fn from_document(document: &Value) -> anyhow::Result<Self> {
        if !document.is_object() {
            anyhow::bail!("expected a JSON object");
        }
        Ok(serde_json::from_value(document.clone())?)
    }
}

/// Legacy preprocessed shape: the instructor plus cleaned review bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedReviews {
    pub professor: String,
    pub reviews: Vec<String>,
}

/// Statistics for one course.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseStats {
    /// Number of offerings of this course in the taught list.
    pub times_taught: usize,
    /// Number of reviews written for this course.
    pub num_reviews: usize,
    /// Mean rating rounded to two decimals, `0.0` without reviews.
    pub avg_rating: f64,
    /// Non-empty review bodies for this course, joined by single spaces.
    pub merged_reviews: String,
}

/// Compact highlight entry for the most frequently taught courses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCourse {
    pub course_code: CourseCode,
    pub times_taught: usize,
    pub avg_rating: f64,
}

/// Structured per-instructor summary derived from a raw record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstructorAggregate {
    /// Instructor name. Left blank by the aggregator and filled by the caller.
    #[serde(default)]
    pub name: String,
    /// Every non-empty review body in encounter order, taught course or not.
    #[serde(default)]
    pub all_merged_reviews: String,
    /// Up to three most frequently taught courses.
    #[serde(default)]
    pub teaches: Vec<TopCourse>,
    /// Per-course statistics keyed by course code (lexicographic order).
    #[serde(default)]
    pub courses: BTreeMap<CourseCode, CourseStats>,
}

/// File-name slug for an instructor: whitespace runs become `_`.
pub fn instructor_slug(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Query form of an instructor name: whitespace runs become `+`.
pub fn query_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("+")
}

/// Recover a readable instructor name from a file stem such as
/// `reviews_Aric+Grossman_llm` or `Aric_Grossman`.
pub fn display_name_from_stem(stem: &str) -> String {
    let trimmed = stem.strip_prefix("reviews_").unwrap_or(stem);
    let trimmed = trimmed.strip_suffix("_llm").unwrap_or(trimmed);

    trimmed
        .split(['_', '+'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        _ => None,
    })
}

fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_reviews<'de, D>(deserializer: D) -> Result<Vec<ReviewEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_review_entry_tolerates_odd_types() {
        let entry: ReviewEntry = serde_json::from_value(json!({
            "course": 101,
            "rating": "five",
            "review": null
        }))
        .unwrap();

        assert_eq!(entry.course, None);
        assert_eq!(entry.rating, None);
        assert_eq!(entry.review, None);
    }

    #[test]
    fn test_review_entry_boolean_rating_is_not_numeric() {
        let entry: ReviewEntry =
            serde_json::from_value(json!({"course": "CS101", "rating": true})).unwrap();
        assert_eq!(entry.rating, None);
        assert!(entry.is_for("CS101"));
    }

    #[test]
    fn test_raw_record_defaults() {
        let record: RawReviewRecord = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record, RawReviewRecord::default());

        let record: RawReviewRecord = serde_json::from_value(json!({
            "name": "Aric Grossman",
            "courses": ["CS101", 7, "CS200"],
            "reviews": "not a list"
        }))
        .unwrap();
        assert_eq!(record.name.as_deref(), Some("Aric Grossman"));
        assert_eq!(record.courses, vec!["CS101", "CS200"]);
        assert!(record.reviews.is_empty());
    }

    #[test]
    fn test_raw_record_skips_non_object_reviews() {
        let record: RawReviewRecord = serde_json::from_value(json!({
            "reviews": [
                "stray string",
                {"course": "CS101", "rating": 4, "review": "Great"}
            ]
        }))
        .unwrap();

        assert_eq!(record.reviews.len(), 1);
        assert_eq!(record.reviews[0].rating, Some(4.0));
    }

    #[test]
    fn test_from_document_requires_object() {
        assert!(RawReviewRecord::from_document(&json!([1, 2, 3])).is_err());
        assert!(RawReviewRecord::from_document(&json!("text")).is_err());

        let record = RawReviewRecord::from_document(&json!({"courses": ["CS101"]})).unwrap();
        assert_eq!(record.courses, vec!["CS101"]);
    }

    #[test]
    fn test_trimmed_body() {
        let entry = ReviewEntry {
            course: None,
            rating: None,
            review: Some("  \n ".to_string()),
        };
        assert_eq!(entry.trimmed_body(), None);

        let entry = ReviewEntry {
            review: Some("  Tough but fair \n".to_string()),
            ..entry
        };
        assert_eq!(entry.trimmed_body(), Some("Tough but fair"));
    }

    #[test]
    fn test_instructor_naming() {
        assert_eq!(instructor_slug("Aric  Grossman"), "Aric_Grossman");
        assert_eq!(query_name("Aric Grossman"), "Aric+Grossman");
        assert_eq!(display_name_from_stem("reviews_Aric+Grossman_llm"), "Aric Grossman");
        assert_eq!(display_name_from_stem("Aric_Grossman_llm"), "Aric Grossman");
        assert_eq!(display_name_from_stem("Aric_Grossman"), "Aric Grossman");
    }

    #[test]
    fn test_aggregate_courses_serialize_in_key_order() {
        let mut aggregate = InstructorAggregate::default();
        aggregate
            .courses
            .insert("MATH300".to_string(), CourseStats::default());
        aggregate
            .courses
            .insert("CS101".to_string(), CourseStats::default());

        let json = serde_json::to_string(&aggregate).unwrap();
        let cs = json.find("CS101").unwrap();
        let math = json.find("MATH300").unwrap();
        assert!(cs < math);
    }
}
