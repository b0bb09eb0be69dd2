//! Review text cleaning.
//!
//! Produces the legacy `{professor, reviews}` shape: trimmed bodies with
//! line breaks flattened, empty bodies dropped, input order preserved.

use crate::models::{CleanedReviews, RawReviewRecord, UNKNOWN_INSTRUCTOR};

/// Clean a raw record into the legacy review-list shape.
pub fn clean_record(record: &RawReviewRecord) -> CleanedReviews {
    let professor = record
        .name
        .clone()
        .unwrap_or_else(|| UNKNOWN_INSTRUCTOR.to_string());

    let reviews = record
        .reviews
        .iter()
        .filter_map(|entry| entry.review.as_deref())
        .map(clean_body)
        .filter(|body| !body.is_empty())
        .collect();

    CleanedReviews { professor, reviews }
}

/// Trim a review body and replace each embedded line break with a space.
pub fn clean_body(body: &str) -> String {
    body.trim()
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}
