//! Top-N course selection.

use crate::models::{CourseCode, CourseStats, TopCourse};
use std::collections::BTreeMap;

/// Number of courses highlighted in an instructor aggregate.
pub const TOP_COURSE_LIMIT: usize = 3;

/// Get the `n` most frequently taught courses.
///
/// Ties on `times_taught` keep the lexicographic course order of the map
/// (the sort is stable and has no secondary key).
pub fn top_courses(courses: &BTreeMap<CourseCode, CourseStats>, n: usize) -> Vec<TopCourse> {
    let mut ranked: Vec<_> = courses.iter().collect();
    ranked.sort_by_key(|(_, stats)| std::cmp::Reverse(stats.times_taught));
    ranked.truncate(n);

    ranked
        .into_iter()
        .map(|(code, stats)| TopCourse {
            course_code: code.clone(),
            times_taught: stats.times_taught,
            avg_rating: stats.avg_rating,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(times_taught: usize, avg_rating: f64) -> CourseStats {
        CourseStats {
            times_taught,
            num_reviews: 1,
            avg_rating,
            merged_reviews: String::new(),
        }
    }

    fn mapping(entries: &[(&str, usize)]) -> BTreeMap<CourseCode, CourseStats> {
        entries
            .iter()
            .map(|(code, taught)| (code.to_string(), stats(*taught, 4.0)))
            .collect()
    }

    #[test]
    fn test_top_courses_ranks_by_times_taught() {
        let courses = mapping(&[("CS101", 1), ("CS200", 4), ("MATH300", 2), ("PHYS150", 3)]);

        let top = top_courses(&courses, TOP_COURSE_LIMIT);
        let codes: Vec<_> = top.iter().map(|t| t.course_code.as_str()).collect();

        assert_eq!(codes, vec!["CS200", "PHYS150", "MATH300"]);
        assert_eq!(top[0].times_taught, 4);
        assert_eq!(top[0].avg_rating, 4.0);
    }

    #[test]
    fn test_top_courses_ties_keep_lexicographic_order() {
        let courses = mapping(&[("MATH300", 2), ("BIO100", 2), ("CS101", 2), ("ART110", 1)]);

        let top = top_courses(&courses, TOP_COURSE_LIMIT);
        let codes: Vec<_> = top.iter().map(|t| t.course_code.as_str()).collect();

        assert_eq!(codes, vec!["BIO100", "CS101", "MATH300"]);
    }

    #[test]
    fn test_top_courses_with_fewer_courses() {
        let courses = mapping(&[("CS101", 1)]);
        assert_eq!(top_courses(&courses, TOP_COURSE_LIMIT).len(), 1);
        assert!(top_courses(&BTreeMap::new(), TOP_COURSE_LIMIT).is_empty());
    }

    #[test]
    fn test_top_courses_only_returns_known_courses() {
        let courses = mapping(&[("A", 3), ("B", 5), ("C", 1), ("D", 9), ("E", 2)]);
        let top = top_courses(&courses, TOP_COURSE_LIMIT);

        assert!(top.len() <= TOP_COURSE_LIMIT);
        assert!(top.iter().all(|t| courses.contains_key(&t.course_code)));
    }
}
