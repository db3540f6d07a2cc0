//! Platform compatibility heuristics.
//!
//! Each known platform has a profile: the formats its runtimes load
//! natively and, for constrained devices, a ceiling on artifact size. A
//! verdict is recomputed on every call and never persisted.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::format::{Framework, ModelFormat};

const MIB: u64 = 1024 * 1024;

/// Deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Android,
    Ios,
    RaspberryPi,
    Coral,
    Jetson,
    Web,
    Server,
    /// A platform name with no profile.
    Unrecognized(String),
}

impl Platform {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::RaspberryPi => "raspberry_pi",
            Self::Coral => "coral",
            Self::Jetson => "jetson",
            Self::Web => "web",
            Self::Server => "server",
            Self::Unrecognized(name) => name,
        }
    }

    /// Capability profile, or `None` for unrecognized platforms.
    pub fn profile(&self) -> Option<PlatformProfile> {
        use ModelFormat::*;
        let profile = match self {
            Self::Android => PlatformProfile::constrained(&[TfLite, Onnx], 512 * MIB),
            Self::Ios => PlatformProfile::constrained(&[CoreMl, TfLite], 512 * MIB),
            Self::RaspberryPi => PlatformProfile::constrained(&[TfLite, Onnx], 256 * MIB),
            Self::Coral => PlatformProfile::constrained(&[TfLite], 64 * MIB),
            Self::Jetson => PlatformProfile::constrained(
                &[Onnx, TfLite, SavedModel, TfGraph, PyTorch],
                4096 * MIB,
            ),
            Self::Web => PlatformProfile::constrained(&[Onnx, TfLite], 128 * MIB),
            Self::Server => PlatformProfile {
                native_formats: &[
                    SavedModel,
                    TfLite,
                    TfGraph,
                    Onnx,
                    PyTorch,
                    Keras,
                    KerasH5,
                    Gguf,
                    Safetensors,
                    CoreMl,
                ],
                max_size: None,
            },
            Self::Unrecognized(_) => return None,
        };
        Some(profile)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let platform = match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "android" => Self::Android,
            "ios" => Self::Ios,
            "raspberry_pi" | "raspberrypi" | "rpi" => Self::RaspberryPi,
            "coral" | "edgetpu" | "edge_tpu" => Self::Coral,
            "jetson" => Self::Jetson,
            "web" | "browser" | "wasm" => Self::Web,
            "server" | "cloud" => Self::Server,
            _ => Self::Unrecognized(s.trim().to_string()),
        };
        Ok(platform)
    }
}

/// What a platform can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    pub native_formats: &'static [ModelFormat],
    /// Size ceiling for resource-constrained devices.
    pub max_size: Option<u64>,
}

impl PlatformProfile {
    const fn constrained(native_formats: &'static [ModelFormat], max_size: u64) -> Self {
        Self {
            native_formats,
            max_size: Some(max_size),
        }
    }

    pub fn supports(&self, format: ModelFormat) -> bool {
        self.native_formats.contains(&format)
    }
}

/// Heuristic judgment of whether an artifact fits a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityVerdict {
    pub platform: Platform,
    pub framework: Option<Framework>,
    pub compatible: bool,
    pub issues: Vec<String>,
}

impl CompatibilityVerdict {
    /// Verdict for an artifact that could not be inspected.
    pub fn unreadable(platform: Platform, framework: Option<Framework>, issue: String) -> Self {
        Self {
            platform,
            framework,
            compatible: false,
            issues: vec![issue],
        }
    }
}

/// Judge an artifact of `format` and `size` bytes against `platform`.
///
/// `framework` defaults to the one implied by the format.
pub fn assess(
    format: ModelFormat,
    size: u64,
    platform: &Platform,
    framework: Option<Framework>,
) -> CompatibilityVerdict {
    let framework = framework.or_else(|| format.framework());
    let mut issues = Vec::new();

    let compatible = match platform.profile() {
        Some(profile) if profile.supports(format) => match profile.max_size {
            Some(max) if size > max => {
                issues.push(format!(
                    "artifact is {size} bytes, above the {max} byte limit for {platform}"
                ));
                false
            }
            _ => true,
        },
        Some(_) if format == ModelFormat::Unknown => {
            issues.push(format!("unknown format cannot be deployed to {platform}"));
            false
        }
        Some(profile) => {
            issues.push(format!(
                "{format} is not natively supported on {platform} (supported: {})",
                join_formats(profile.native_formats)
            ));
            false
        }
        None if format == ModelFormat::Unknown => {
            issues.push(format!(
                "no profile for platform '{platform}' and the format is unknown"
            ));
            false
        }
        None => {
            issues.push(format!(
                "no profile for platform '{platform}'; assuming {format} is loadable"
            ));
            true
        }
    };

    if let Some(fw) = framework {
        if format != ModelFormat::Unknown && !fw.can_load(format) {
            issues.push(format!("{fw} cannot load {format} artifacts"));
        }
    }

    CompatibilityVerdict {
        platform: platform.clone(),
        framework,
        compatible,
        issues,
    }
}

fn join_formats(formats: &[ModelFormat]) -> String {
    formats
        .iter()
        .map(ModelFormat::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(name: &str) -> Platform {
        name.parse().unwrap()
    }

    #[test]
    fn test_native_format_is_compatible() {
        let verdict = assess(ModelFormat::TfLite, 10 * MIB, &Platform::Android, None);
        assert!(verdict.compatible);
        assert!(verdict.issues.is_empty());
        assert_eq!(verdict.framework, Some(Framework::TensorFlowLite));
    }

    #[test]
    fn test_size_ceiling_on_constrained_device() {
        let verdict = assess(ModelFormat::TfLite, 65 * MIB, &Platform::Coral, None);
        assert!(!verdict.compatible);
        assert_eq!(verdict.issues.len(), 1);
        assert!(verdict.issues[0].contains("limit for coral"));
    }

    #[test]
    fn test_server_has_no_ceiling() {
        let verdict = assess(ModelFormat::Gguf, 40 * 1024 * MIB, &Platform::Server, None);
        assert!(verdict.compatible);
    }

    #[test]
    fn test_unsupported_format() {
        let verdict = assess(ModelFormat::PyTorch, MIB, &Platform::Ios, None);
        assert!(!verdict.compatible);
        assert!(verdict.issues[0].contains("not natively supported"));
    }

    #[test]
    fn test_unrecognized_platform_depends_on_format() {
        let fridge = platform("smart-fridge");
        assert_eq!(fridge, Platform::Unrecognized("smart-fridge".to_string()));

        let known = assess(ModelFormat::Onnx, MIB, &fridge, None);
        assert!(known.compatible);
        assert_eq!(known.issues.len(), 1);

        let unknown = assess(ModelFormat::Unknown, MIB, &fridge, None);
        assert!(!unknown.compatible);
        assert_eq!(unknown.issues.len(), 1);
    }

    #[test]
    fn test_framework_mismatch_is_reported() {
        let verdict = assess(
            ModelFormat::TfLite,
            MIB,
            &Platform::Android,
            Some(Framework::PyTorch),
        );
        assert!(verdict.compatible);
        assert!(verdict.issues[0].contains("pytorch cannot load tflite"));
    }

    #[test]
    fn test_platform_aliases() {
        assert_eq!(platform("Raspberry Pi"), Platform::RaspberryPi);
        assert_eq!(platform("edge-tpu"), Platform::Coral);
        assert_eq!(platform("browser"), Platform::Web);
    }
}
