//! Persisted artifact metadata.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::inspect::{Framework, ParseNameError};

/// Identifier assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub u64);

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArtifactId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse().map(ArtifactId)
    }
}

/// What a model does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Classification,
    Detection,
    Segmentation,
    Recognition,
    Generation,
    Embedding,
    Other,
}

impl ModelType {
    pub const ALL: [ModelType; 7] = [
        Self::Classification,
        Self::Detection,
        Self::Segmentation,
        Self::Recognition,
        Self::Generation,
        Self::Embedding,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Detection => "detection",
            Self::Segmentation => "segmentation",
            Self::Recognition => "recognition",
            Self::Generation => "generation",
            Self::Embedding => "embedding",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| ParseNameError::new("model type", s))
    }
}

/// Task a model can perform on the edge device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    AdDetection,
    ObjectDetection,
    FaceDetection,
    SceneClassification,
    TextRecognition,
    SpeechRecognition,
    AudioClassification,
    ContentModeration,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Self::AdDetection,
        Self::ObjectDetection,
        Self::FaceDetection,
        Self::SceneClassification,
        Self::TextRecognition,
        Self::SpeechRecognition,
        Self::AudioClassification,
        Self::ContentModeration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdDetection => "ad_detection",
            Self::ObjectDetection => "object_detection",
            Self::FaceDetection => "face_detection",
            Self::SceneClassification => "scene_classification",
            Self::TextRecognition => "text_recognition",
            Self::SpeechRecognition => "speech_recognition",
            Self::AudioClassification => "audio_classification",
            Self::ContentModeration => "content_moderation",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ParseNameError::new("capability", s))
    }
}

/// Metadata for one installed artifact version.
///
/// `(name, version)` is unique within a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: ArtifactId,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub model_type: ModelType,
    pub framework: Framework,
    pub download_url: String,
    /// Where the artifact lives on disk.
    pub local_path: PathBuf,
    pub file_size: u64,
    /// SHA-256, lowercase hex.
    pub checksum: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    pub min_framework_version: Option<String>,
    #[serde(default)]
    pub required_gpu: bool,
    #[serde(default)]
    pub is_validated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArtifactRecord {
    /// Build a record from creation data.
    pub fn from_new(id: ArtifactId, data: NewArtifact, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: data.name,
            version: data.version,
            description: data.description,
            model_type: data.model_type,
            framework: data.framework,
            download_url: data.download_url,
            local_path: data.local_path,
            file_size: data.file_size,
            checksum: data.checksum,
            tags: data.tags,
            capabilities: data.capabilities,
            min_framework_version: data.min_framework_version,
            required_gpu: data.required_gpu,
            is_validated: data.is_validated,
            created_at: now,
            updated_at: now,
        }
    }

    /// `name@version`.
    pub fn key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// Data for creating a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArtifact {
    pub name: String,
    pub version: String,
    pub description: String,
    pub model_type: ModelType,
    pub framework: Framework,
    pub download_url: String,
    pub local_path: PathBuf,
    pub file_size: u64,
    pub checksum: String,
    pub tags: BTreeSet<String>,
    pub capabilities: BTreeSet<Capability>,
    pub min_framework_version: Option<String>,
    pub required_gpu: bool,
    pub is_validated: bool,
}

/// Partial update of a record. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPatch {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub model_type: Option<ModelType>,
    pub framework: Option<Framework>,
    pub download_url: Option<String>,
    pub local_path: Option<PathBuf>,
    pub file_size: Option<u64>,
    pub checksum: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub capabilities: Option<BTreeSet<Capability>>,
    pub min_framework_version: Option<Option<String>>,
    pub required_gpu: Option<bool>,
    pub is_validated: Option<bool>,
}

impl ArtifactPatch {
    /// Patch that replaces every content field with `data`.
    pub fn replace_with(data: NewArtifact) -> Self {
        Self {
            name: Some(data.name),
            version: Some(data.version),
            description: Some(data.description),
            model_type: Some(data.model_type),
            framework: Some(data.framework),
            download_url: Some(data.download_url),
            local_path: Some(data.local_path),
            file_size: Some(data.file_size),
            checksum: Some(data.checksum),
            tags: Some(data.tags),
            capabilities: Some(data.capabilities),
            min_framework_version: Some(data.min_framework_version),
            required_gpu: Some(data.required_gpu),
            is_validated: Some(data.is_validated),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch, stamping `updated_at`.
    pub fn apply(self, record: &mut ArtifactRecord, now: DateTime<Utc>) {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field {
                    record.$field = value;
                })*
            };
        }
        set!(
            name,
            version,
            description,
            model_type,
            framework,
            download_url,
            local_path,
            file_size,
            checksum,
            tags,
            capabilities,
            min_framework_version,
            required_gpu,
            is_validated
        );
        record.updated_at = now;
    }
}
