//! Semantic version parsing and precedence.

use std::cmp::Ordering;
use std::fmt;

use semver::Version;

use super::error::{VersionError, VersionResult};

/// A parsed semantic version.
///
/// Equality and ordering follow semantic-version precedence: build
/// metadata is ignored, so `1.0.0+a == 1.0.0+b`.
#[derive(Debug, Clone)]
pub struct VersionInfo {
    version: Version,
}

impl VersionInfo {
    pub fn major(&self) -> u64 {
        self.version.major
    }

    pub fn minor(&self) -> u64 {
        self.version.minor
    }

    pub fn patch(&self) -> u64 {
        self.version.patch
    }

    /// Prerelease identifiers, empty for a release.
    pub fn prerelease(&self) -> &str {
        self.version.pre.as_str()
    }

    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }

    /// Build metadata, empty when absent.
    pub fn build(&self) -> &str {
        self.version.build.as_str()
    }

    /// The underlying [`semver::Version`].
    pub fn as_semver(&self) -> &Version {
        &self.version
    }
}

impl From<Version> for VersionInfo {
    fn from(version: Version) -> Self {
        Self { version }
    }
}

impl PartialEq for VersionInfo {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionInfo {}

impl PartialOrd for VersionInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = &self.version;
        let b = &other.version;
        (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.version, f)
    }
}

impl std::str::FromStr for VersionInfo {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse a semantic version string.
///
/// Surrounding whitespace and a single leading `v` are accepted.
///
/// # Errors
///
/// Returns [`VersionError::InvalidVersion`] for anything that is not a
/// semantic version.
pub fn parse(version: &str) -> VersionResult<VersionInfo> {
    let trimmed = version.trim();
    let bare = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    Version::parse(bare)
        .map(VersionInfo::from)
        .map_err(|e| VersionError::InvalidVersion {
            version: version.to_string(),
            reason: e.to_string(),
        })
}

/// Compare two version strings by semantic-version precedence.
pub fn compare(a: &str, b: &str) -> VersionResult<Ordering> {
    Ok(parse(a)?.cmp(&parse(b)?))
}

/// Whether the string parses as a semantic version.
pub fn is_valid(version: &str) -> bool {
    parse(version).is_ok()
}
