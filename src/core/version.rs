//! Version ordering
//!
//! Platform and tool versions are listed oldest first so that the last
//! entry is the newest. Index versions are mostly semver; the few that are
//! not (`1.0`, `2017.3.1-r5`) fall back to a segment-wise comparison.

use semver::Version;
use std::cmp::Ordering;

/// Compare two version strings
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(va), Ok(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        _ => compare_segments(a, b),
    }
}

/// Sort versions oldest first, dropping duplicates
pub fn sort_versions(versions: &mut Vec<String>) {
    versions.sort_by(|a, b| compare_versions(a, b));
    versions.dedup();
}

fn compare_segments(a: &str, b: &str) -> Ordering {
    let split = |s: &str| -> Vec<String> {
        s.split(|c: char| c == '.' || c == '-')
            .map(str::to_string)
            .collect()
    };
    let left = split(a);
    let right = split(b);

    for (l, r) in left.iter().zip(right.iter()) {
        let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => l.cmp(r),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators::{index_version, version_string};
    use proptest::prelude::*;

    #[test]
    fn test_semver_ordering() {
        assert_eq!(compare_versions("1.8.6", "1.8.10"), Ordering::Less);
        assert_eq!(compare_versions("2.0.0", "1.99.99"), Ordering::Greater);
    }

    #[test]
    fn test_non_semver_ordering() {
        assert_eq!(compare_versions("1.0", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("4.3.2-arduino2", "4.3.2"), Ordering::Less);
        assert_eq!(compare_versions("2017.3", "2017.10"), Ordering::Less);
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
    }

    #[test]
    fn test_sort_versions_newest_last() {
        let mut versions = vec![
            "1.8.10".to_string(),
            "1.6.23".to_string(),
            "1.8.6".to_string(),
            "1.8.6".to_string(),
        ];
        sort_versions(&mut versions);
        assert_eq!(versions, vec!["1.6.23", "1.8.6", "1.8.10"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Comparison is antisymmetric
        #[test]
        fn prop_compare_antisymmetric(a in index_version(), b in index_version()) {
            prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
        }

        /// Sorting leaves every neighbour pair ordered
        #[test]
        fn prop_sort_versions_ordered(
            mut versions in prop::collection::vec(version_string(), 0..8),
        ) {
            sort_versions(&mut versions);
            for pair in versions.windows(2) {
                prop_assert_ne!(compare_versions(&pair[0], &pair[1]), Ordering::Greater);
            }
        }
    }
}
