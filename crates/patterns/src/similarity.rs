use std::collections::HashSet;

const DAY_MS: u64 = 86_400_000;

/// Jaccard similarity between two path lists treated as sets.
///
/// Symmetric; 1.0 for identical nonempty sets; 0.0 when the union is empty.
pub fn jaccard(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64
}

/// Age-bucketed multiplier that discounts older patterns during ranking.
pub fn decay_factor(last_used_ms: u64, now_ms: u64) -> f64 {
    let age_days = now_ms.saturating_sub(last_used_ms) / DAY_MS;
    match age_days {
        0..=6 => 1.0,
        7..=13 => 0.9,
        14..=29 => 0.7,
        30..=59 => 0.5,
        _ => 0.3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn jaccard_of_identical_nonempty_sets_is_one() {
        let a = paths(&["src/a.ts", "src/b.ts"]);
        assert_eq!(jaccard(&a, &a), 1.0);
    }

    #[test]
    fn jaccard_of_disjoint_sets_is_zero() {
        assert_eq!(
            jaccard(&paths(&["src/a.ts"]), &paths(&["src/b.ts"])),
            0.0
        );
    }

    #[test]
    fn jaccard_counts_overlap() {
        // |{a} ∩ {a,b,c}| / |{a} ∪ {a,b,c}| = 1/3
        let sim = jaccard(&paths(&["a"]), &paths(&["a", "b", "c"]));
        assert!((sim - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn jaccard_ignores_duplicates_and_order() {
        let sim = jaccard(&paths(&["a", "a", "b"]), &paths(&["b", "a"]));
        assert_eq!(sim, 1.0);
    }

    #[test]
    fn empty_union_is_zero() {
        assert_eq!(jaccard(&[], &[]), 0.0);
    }

    #[test]
    fn decay_buckets_by_age() {
        const DAY: u64 = 86_400_000;
        let now = 100 * DAY;
        assert_eq!(decay_factor(now, now), 1.0);
        assert_eq!(decay_factor(now - 6 * DAY, now), 1.0);
        assert_eq!(decay_factor(now - 7 * DAY, now), 0.9);
        assert_eq!(decay_factor(now - 14 * DAY, now), 0.7);
        assert_eq!(decay_factor(now - 30 * DAY, now), 0.5);
        assert_eq!(decay_factor(now - 60 * DAY, now), 0.3);
        assert_eq!(decay_factor(0, now), 0.3);
    }

    proptest! {
        #[test]
        fn jaccard_is_symmetric_and_bounded(
            a in proptest::collection::vec("[a-d]/[a-z]{1,3}", 0..8),
            b in proptest::collection::vec("[a-d]/[a-z]{1,3}", 0..8),
        ) {
            let ab = jaccard(&a, &b);
            let ba = jaccard(&b, &a);
            prop_assert!((ab - ba).abs() < 1e-12);
            prop_assert!((0.0..=1.0).contains(&ab));
        }
    }
}
