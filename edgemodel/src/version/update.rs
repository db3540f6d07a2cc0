//! Classifying the delta between an installed and an available version.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::semantic::parse;
use crate::store::ArtifactId;

/// Kind of change between two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    None,
    Patch,
    Minor,
    Major,
    Prerelease,
}

impl UpdateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Prerelease => "prerelease",
        }
    }

    /// Only major bumps are breaking.
    pub fn is_breaking(&self) -> bool {
        *self == Self::Major
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of comparing a current version with the latest available one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub has_update: bool,
    pub update_type: UpdateType,
}

impl Classification {
    pub fn is_breaking_change(&self) -> bool {
        self.update_type.is_breaking()
    }
}

/// Classify the change from `current` to `latest`.
///
/// When `latest` is not newer the type is [`UpdateType::None`]. If either
/// string fails to parse the result degrades to a `minor` update whenever
/// the strings differ, so callers always get a usable answer.
pub fn classify_update(current: &str, latest: &str) -> Classification {
    let (current_v, latest_v) = match (parse(current), parse(latest)) {
        (Ok(c), Ok(l)) => (c, l),
        _ => {
            return Classification {
                has_update: current.trim() != latest.trim(),
                update_type: UpdateType::Minor,
            };
        }
    };

    if latest_v <= current_v {
        return Classification {
            has_update: false,
            update_type: UpdateType::None,
        };
    }

    let update_type = if latest_v.major() > current_v.major() {
        UpdateType::Major
    } else if latest_v.minor() > current_v.minor() {
        UpdateType::Minor
    } else if latest_v.patch() > current_v.patch() {
        UpdateType::Patch
    } else if latest_v.is_prerelease() {
        UpdateType::Prerelease
    } else {
        // Release of the current prerelease: newer, but no numeric bump.
        UpdateType::None
    };

    Classification {
        has_update: true,
        update_type,
    }
}

/// Result of an update check for one installed artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateCheckResult {
    pub model_id: ArtifactId,
    pub model_name: String,
    pub current_version: String,
    pub latest_version: String,
    pub has_update: bool,
    pub update_type: UpdateType,
    pub is_breaking_change: bool,
    pub download_url: Option<String>,
}

impl UpdateCheckResult {
    /// Build a result from a classification of `current` against `latest`.
    pub fn new(
        model_id: ArtifactId,
        model_name: impl Into<String>,
        current_version: impl Into<String>,
        latest_version: impl Into<String>,
        download_url: Option<String>,
    ) -> Self {
        let current_version = current_version.into();
        let latest_version = latest_version.into();
        let classification = classify_update(&current_version, &latest_version);

        Self {
            model_id,
            model_name: model_name.into(),
            current_version,
            latest_version,
            has_update: classification.has_update,
            update_type: classification.update_type,
            is_breaking_change: classification.is_breaking_change(),
            download_url: if classification.has_update {
                download_url
            } else {
                None
            },
        }
    }
}
