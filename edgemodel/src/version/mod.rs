//! Semantic-version reasoning for artifact families.
//!
//! - Parsing and precedence (`semantic`)
//! - Newest-first ordering and latest selection (`latest`)
//! - Update classification and check results (`update`)
//! - The update policy gate (`policy`)

mod error;
mod latest;
mod policy;
mod semantic;
mod update;

pub use error::{VersionError, VersionResult};
pub use latest::{parsed_newest_first, select_latest, sort_newest_first};
pub use policy::{should_allow_update, UpdatePolicy};
pub use semantic::{compare, is_valid, parse, VersionInfo};
pub use update::{classify_update, Classification, UpdateCheckResult, UpdateType};

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::cmp::Ordering;

    fn version_string() -> impl Strategy<Value = String> {
        (
            0u64..20,
            0u64..20,
            0u64..20,
            prop::option::of(prop::sample::select(vec!["alpha", "alpha.1", "beta.2", "rc.1", "rc.10"])),
        )
            .prop_map(|(major, minor, patch, pre)| match pre {
                Some(pre) => format!("{major}.{minor}.{patch}-{pre}"),
                None => format!("{major}.{minor}.{patch}"),
            })
    }

    proptest! {
        #[test]
        fn test_compare_is_antisymmetric(a in version_string(), b in version_string()) {
            let ab = compare(&a, &b).unwrap();
            let ba = compare(&b, &a).unwrap();
            prop_assert_eq!(ab, ba.reverse());
        }

        #[test]
        fn test_compare_is_reflexive(a in version_string()) {
            prop_assert_eq!(compare(&a, &a).unwrap(), Ordering::Equal);
        }

        #[test]
        fn test_major_iff_breaking(a in version_string(), b in version_string()) {
            let classification = classify_update(&a, &b);
            prop_assert_eq!(
                classification.update_type == UpdateType::Major,
                classification.is_breaking_change()
            );
        }

        #[test]
        fn test_has_update_matches_ordering(a in version_string(), b in version_string()) {
            let classification = classify_update(&a, &b);
            prop_assert_eq!(
                classification.has_update,
                compare(&b, &a).unwrap() == Ordering::Greater
            );
        }

        #[test]
        fn test_select_latest_is_maximum(versions in prop::collection::vec(version_string(), 1..12)) {
            let latest = select_latest(&versions, String::as_str, true).unwrap();
            for v in &versions {
                prop_assert_ne!(compare(v, latest).unwrap(), Ordering::Greater);
            }
        }
    }
}
