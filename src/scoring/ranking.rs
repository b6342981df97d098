use std::cmp::Ordering;

use crate::models::{RealValues, Submission};
use crate::scoring::{distance, RankedEntry};

/// Rank all submissions against the known real values, best score first.
///
/// Finite scores compare numerically and infinite scores all sort after
/// them. `sort_by` is stable, so submissions with equal scores (including
/// the all-infinite case) keep their insertion order. The last entry of the
/// result carries `is_last`, whatever its score is.
pub fn build_ranking(
    submissions: &[Submission],
    real: &RealValues,
    outcomes: &[String],
) -> Vec<RankedEntry> {
    let mut scored: Vec<(String, f64)> = submissions
        .iter()
        .map(|s| (s.name.clone(), distance::score(&s.values, real, outcomes)))
        .collect();

    // Scores are never NaN, so partial_cmp only falls back on Equal for two
    // infinities, which the stable sort leaves in input order.
    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let total = scored.len();
    scored
        .into_iter()
        .enumerate()
        .map(|(idx, (name, score))| RankedEntry {
            position: idx + 1,
            name,
            score,
            is_last: idx + 1 == total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn outcomes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn values(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn submission(name: &str, pairs: &[(&str, f64)]) -> Submission {
        Submission {
            name: name.to_string(),
            values: values(pairs),
        }
    }

    #[test]
    fn empty_input_yields_empty_ranking() {
        let ranking = build_ranking(&[], &RealValues::new(), &outcomes(&["A"]));
        assert!(ranking.is_empty());
    }

    #[test]
    fn sorts_ascending_and_assigns_positions() {
        let outcomes = outcomes(&["A", "B"]);
        let submissions = vec![
            submission("far", &[("A", 10.0), ("B", 90.0)]),
            submission("close", &[("A", 44.0), ("B", 56.0)]),
        ];
        let real = values(&[("A", 45.0), ("B", 55.0)]);

        let ranking = build_ranking(&submissions, &real, &outcomes);
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].name, "close");
        assert_eq!(ranking[0].position, 1);
        assert!(!ranking[0].is_last);
        assert_eq!(ranking[1].name, "far");
        assert_eq!(ranking[1].position, 2);
        assert!(ranking[1].is_last);
        assert!(ranking[0].score <= ranking[1].score);
    }

    #[test]
    fn equal_scores_keep_insertion_order() {
        let outcomes = outcomes(&["A", "B"]);
        // X and Y are both at distance sqrt(50) from the real values.
        let submissions = vec![
            submission("X", &[("A", 40.0), ("B", 60.0)]),
            submission("Y", &[("A", 50.0), ("B", 50.0)]),
        ];
        let real = values(&[("A", 45.0), ("B", 55.0)]);

        let ranking = build_ranking(&submissions, &real, &outcomes);
        assert_eq!(ranking[0].name, "X");
        assert_eq!(ranking[0].position, 1);
        assert_eq!(ranking[1].name, "Y");
        assert_eq!(ranking[1].position, 2);
        assert!((ranking[0].score - ranking[1].score).abs() < 1e-12);
    }

    #[test]
    fn unscoreable_entries_sort_after_finite_ones() {
        let outcomes = outcomes(&["A"]);
        let submissions = vec![
            submission("blank", &[]),
            submission("scored", &[("A", 50.0)]),
        ];
        let real = values(&[("A", 45.0)]);

        let ranking = build_ranking(&submissions, &real, &outcomes);
        assert_eq!(ranking[0].name, "scored");
        assert_eq!(ranking[1].name, "blank");
        assert_eq!(ranking[1].score, f64::INFINITY);
        assert!(ranking[1].is_last);
    }

    #[test]
    fn all_unknown_real_values_preserve_insertion_order() {
        let outcomes = outcomes(&["A", "B"]);
        let submissions = vec![
            submission("first", &[("A", 1.0), ("B", 2.0)]),
            submission("second", &[("A", 3.0), ("B", 4.0)]),
            submission("third", &[("A", 5.0), ("B", 6.0)]),
        ];
        let real = RealValues::new();

        let ranking = build_ranking(&submissions, &real, &outcomes);
        let names: Vec<&str> = ranking.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert!(ranking.iter().all(|e| e.score == f64::INFINITY));
        let last_flags: Vec<bool> = ranking.iter().map(|e| e.is_last).collect();
        assert_eq!(last_flags, vec![false, false, true]);
    }

    #[test]
    fn exactly_one_entry_is_last() {
        let outcomes = outcomes(&["A"]);
        let submissions = vec![
            submission("a", &[("A", 1.0)]),
            submission("b", &[]),
            submission("c", &[("A", 45.0)]),
        ];
        let real = values(&[("A", 45.0)]);

        let ranking = build_ranking(&submissions, &real, &outcomes);
        assert_eq!(ranking.iter().filter(|e| e.is_last).count(), 1);
        assert!(ranking.last().unwrap().is_last);
    }
}
