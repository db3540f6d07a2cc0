//! Ordering a family of versions and picking the newest.

use std::cmp::Ordering;

use super::semantic::{parse, VersionInfo};

/// Sort items newest first by the version string `version_of` returns.
///
/// Valid semantic versions come first in descending precedence. Strings
/// that do not parse follow, in descending lexicographic order.
pub fn sort_newest_first<T, F>(items: &mut [T], version_of: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by(|a, b| newest_first(version_of(a), version_of(b)));
}

/// Pick the newest item of a family.
///
/// Prereleases are skipped unless `include_prerelease` is set. Strings that
/// do not parse are kept as fallback candidates.
pub fn select_latest<T, F>(items: &[T], version_of: F, include_prerelease: bool) -> Option<&T>
where
    F: Fn(&T) -> &str,
{
    items
        .iter()
        .filter(|item| {
            include_prerelease
                || parse(version_of(*item)).map_or(true, |v| !v.is_prerelease())
        })
        .min_by(|a, b| newest_first(version_of(*a), version_of(*b)))
}

fn newest_first(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Ok(va), Ok(vb)) => vb.cmp(&va),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => b.cmp(a),
    }
}

/// Parse every valid version in `versions`, newest first.
pub fn parsed_newest_first<'a>(versions: impl IntoIterator<Item = &'a str>) -> Vec<VersionInfo> {
    let mut parsed: Vec<VersionInfo> = versions.into_iter().filter_map(|v| parse(v).ok()).collect();
    parsed.sort_by(|a, b| b.cmp(a));
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity<'a>(s: &'a &'static str) -> &'a str {
        *s
    }

    #[test]
    fn test_select_latest_skips_prereleases() {
        let versions = ["1.0.0", "1.2.0", "2.0.0-beta.1", "1.10.0"];

        assert_eq!(select_latest(&versions, identity, false), Some(&"1.10.0"));
        assert_eq!(select_latest(&versions, identity, true), Some(&"2.0.0-beta.1"));
    }

    #[test]
    fn test_invalid_versions_sort_last() {
        let mut versions = ["banana", "0.1.0", "apple", "3.0.0"];
        sort_newest_first(&mut versions, identity);

        assert_eq!(versions, ["3.0.0", "0.1.0", "banana", "apple"]);
    }

    #[test]
    fn test_only_invalid_versions() {
        let versions = ["build-7", "build-10", "build-9"];
        assert_eq!(select_latest(&versions, identity, false), Some(&"build-9"));
    }

    #[test]
    fn test_empty_family() {
        let versions: [&str; 0] = [];
        assert_eq!(select_latest(&versions, identity, true), None);
    }

    #[test]
    fn test_parsed_newest_first() {
        let parsed = parsed_newest_first(["1.0.0", "x", "1.0.1"]);
        let rendered: Vec<String> = parsed.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["1.0.1", "1.0.0"]);
    }
}
