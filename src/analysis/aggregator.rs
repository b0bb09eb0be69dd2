//! Per-course aggregation of review records.
//!
//! This module groups reviews by the courses an instructor taught and
//! computes counts, rounded average ratings, and merged review text.

use crate::analysis::top_courses::{top_courses, TOP_COURSE_LIMIT};
use crate::models::{CourseCode, CourseStats, InstructorAggregate, RawReviewRecord, ReviewEntry};
use std::collections::BTreeMap;

/// Aggregate reviews into per-course statistics and a global corpus.
///
/// Only courses present in `courses` get an entry; reviews for a course that
/// never appears in the taught list are not counted anywhere in `courses`.
/// The returned aggregate has a blank `name` and an empty `teaches` list.
pub fn aggregate_courses(courses: &[CourseCode], reviews: &[ReviewEntry]) -> InstructorAggregate {
    let times_taught = count_offerings(courses);

    // BTreeMap iteration is the lexicographic course order.
    let course_stats = times_taught
        .into_iter()
        .map(|(course, taught)| {
            let stats = course_stats(&course, taught, reviews);
            (course, stats)
        })
        .collect();

    let all_merged_reviews = reviews
        .iter()
        .filter_map(ReviewEntry::trimmed_body)
        .collect::<Vec<_>>()
        .join(" ");

    InstructorAggregate {
        name: String::new(),
        all_merged_reviews,
        teaches: Vec::new(),
        courses: course_stats,
    }
}

/// Build the complete aggregate for one instructor: statistics, the top
/// course highlights, and the given name.
pub fn build_aggregate(name: &str, record: &RawReviewRecord) -> InstructorAggregate {
    let mut aggregate = aggregate_courses(&record.courses, &record.reviews);
    aggregate.name = name.to_string();
    aggregate.teaches = top_courses(&aggregate.courses, TOP_COURSE_LIMIT);
    aggregate
}

/// Count reviews whose course is not in the taught list.
pub fn untaught_review_count(record: &RawReviewRecord) -> usize {
    record
        .reviews
        .iter()
        .filter(|review| {
            !record
                .courses
                .iter()
                .any(|course| review.is_for(course))
        })
        .count()
}

/// Count offerings per course. Duplicates in the taught list are meaningful.
fn count_offerings(courses: &[CourseCode]) -> BTreeMap<CourseCode, usize> {
    let mut counts: BTreeMap<CourseCode, usize> = BTreeMap::new();

    for course in courses {
        *counts.entry(course.clone()).or_default() += 1;
    }

    counts
}

fn course_stats(course: &str, times_taught: usize, reviews: &[ReviewEntry]) -> CourseStats {
    let mut num_reviews = 0;
    let mut rating_sum = 0.0;
    let mut merged = Vec::new();

    for review in reviews.iter().filter(|r| r.is_for(course)) {
        num_reviews += 1;
        if let Some(rating) = review.rating {
            rating_sum += rating;
        }
        if let Some(body) = review.trimmed_body() {
            merged.push(body);
        }
    }

    CourseStats {
        times_taught,
        num_reviews,
        avg_rating: average_rating(rating_sum, num_reviews),
        merged_reviews: merged.join(" "),
    }
}

/// Mean rating rounded to two decimals with ties to even; `0.0` when there
/// are no reviews.
pub fn average_rating(rating_sum: f64, num_reviews: usize) -> f64 {
    if num_reviews == 0 {
        return 0.0;
    }

    round_to_hundredths(rating_sum / num_reviews as f64)
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(course: &str, rating: Option<f64>, body: Option<&str>) -> ReviewEntry {
        ReviewEntry {
            course: Some(course.to_string()),
            rating,
            review: body.map(String::from),
        }
    }

    fn codes(list: &[&str]) -> Vec<CourseCode> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_reference_scenario() {
        let courses = codes(&["CS101", "CS101", "CS200"]);
        let reviews = vec![
            review("CS101", Some(4.0), Some("Great")),
            review("CS101", Some(2.0), Some("")),
            review("CS200", Some(5.0), Some("Tough")),
        ];

        let aggregate = aggregate_courses(&courses, &reviews);

        let cs101 = &aggregate.courses["CS101"];
        assert_eq!(cs101.times_taught, 2);
        assert_eq!(cs101.num_reviews, 2);
        assert_eq!(cs101.avg_rating, 3.0);
        assert_eq!(cs101.merged_reviews, "Great");

        let cs200 = &aggregate.courses["CS200"];
        assert_eq!(cs200.times_taught, 1);
        assert_eq!(cs200.num_reviews, 1);
        assert_eq!(cs200.avg_rating, 5.0);
        assert_eq!(cs200.merged_reviews, "Tough");

        assert_eq!(aggregate.all_merged_reviews, "Great Tough");
        assert!(aggregate.name.is_empty());
    }

    #[test]
    fn test_course_without_reviews() {
        let aggregate = aggregate_courses(&codes(&["CS300"]), &[]);
        let stats = &aggregate.courses["CS300"];
        assert_eq!(stats.num_reviews, 0);
        assert_eq!(stats.avg_rating, 0.0);
        assert_eq!(stats.merged_reviews, "");
    }

    #[test]
    fn test_non_numeric_rating_counts_but_adds_nothing() {
        let reviews = vec![
            review("CS101", Some(5.0), None),
            review("CS101", None, Some("No rating given")),
        ];

        let aggregate = aggregate_courses(&codes(&["CS101"]), &reviews);
        let stats = &aggregate.courses["CS101"];
        assert_eq!(stats.num_reviews, 2);
        assert_eq!(stats.avg_rating, 2.5);
    }

    #[test]
    fn test_average_is_rounded() {
        assert_eq!(average_rating(10.0, 3), 3.33);
        assert_eq!(average_rating(11.0, 3), 3.67);
        assert_eq!(average_rating(0.0, 0), 0.0);
    }

    #[test]
    fn test_average_rounds_ties_to_even() {
        assert_eq!(average_rating(25.0, 8), 3.12);
        assert_eq!(average_rating(1.0, 8), 0.12);
        assert_eq!(average_rating(3.0, 8), 0.38);
    }

    #[test]
    fn test_untaught_course_reviews_are_dropped_from_courses() {
        let reviews = vec![
            review("CS101", Some(4.0), Some("Taught")),
            review("BIO100", Some(1.0), Some("Not on the list")),
        ];
        let record = RawReviewRecord {
            name: None,
            courses: codes(&["CS101"]),
            reviews: reviews.clone(),
        };

        let aggregate = aggregate_courses(&record.courses, &reviews);

        assert!(!aggregate.courses.contains_key("BIO100"));
        let counted: usize = aggregate.courses.values().map(|s| s.num_reviews).sum();
        assert_eq!(counted, 1);
        assert_eq!(untaught_review_count(&record), 1);
        assert_eq!(aggregate.all_merged_reviews, "Taught Not on the list");
    }

    #[test]
    fn test_global_corpus_keeps_encounter_order() {
        let reviews = vec![
            review("MATH300", None, Some("first")),
            review("CS101", None, Some("second")),
            review("MATH300", None, Some("  third  ")),
        ];

        let aggregate = aggregate_courses(&codes(&["CS101", "MATH300"]), &reviews);
        assert_eq!(aggregate.all_merged_reviews, "first second third");
        assert_eq!(aggregate.courses["MATH300"].merged_reviews, "first third");
    }

    #[test]
    fn test_build_aggregate_is_deterministic() {
        let record = RawReviewRecord {
            name: Some("Aric Grossman".to_string()),
            courses: codes(&["CS200", "CS101", "CS101", "MATH300", "CS200", "CS200"]),
            reviews: vec![
                review("CS200", Some(3.0), Some("Fine")),
                review("MATH300", Some(4.5), Some("Proofs")),
            ],
        };

        let first = serde_json::to_string(&build_aggregate("Aric Grossman", &record)).unwrap();
        let second = serde_json::to_string(&build_aggregate("Aric Grossman", &record)).unwrap();
        assert_eq!(first, second);

        let aggregate = build_aggregate("Aric Grossman", &record);
        assert_eq!(aggregate.name, "Aric Grossman");
        assert_eq!(aggregate.teaches.len(), 3);
        assert_eq!(aggregate.teaches[0].course_code, "CS200");
    }
}
