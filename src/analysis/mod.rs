//! Review analysis modules.
//!
//! Course aggregation and the top-course highlight selection.

pub mod aggregator;
pub mod top_courses;

pub use aggregator::{build_aggregate, untaught_review_count};
