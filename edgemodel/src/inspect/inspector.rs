//! The inspector facade.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::json;
use tracing::debug;

use super::checksum;
use super::compatibility::{self, CompatibilityVerdict, Platform};
use super::error::{InspectError, InspectResult};
use super::format::{self, DetectedBy, Detection, Framework, ModelFormat};
use super::metadata;
use super::options::ValidationOptions;
use super::outcome::{ErrorCode, FileMetadata, Severity, ValidationOutcome, WarningCode};
use super::security;

/// Bytes sampled by the null-byte corruption check (1 MiB).
pub const CORRUPTION_SAMPLE_BYTES: u64 = 1024 * 1024;

/// Share of null bytes above which a sample is considered corrupted.
pub const NULL_BYTE_RATIO: f64 = 0.95;

/// Inspects artifacts on the local file system.
///
/// All methods are blocking. Async callers should run them on a blocking
/// thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inspector;

impl Inspector {
    pub fn new() -> Self {
        Self
    }

    /// Validate an artifact against `options`.
    ///
    /// Never fails: I/O problems become critical errors in the outcome.
    pub fn validate(&self, path: &Path, options: &ValidationOptions) -> ValidationOutcome {
        debug!(path = %path.display(), strict = options.strict_mode, "Validating artifact");
        let mut outcome = ValidationOutcome::new();

        let size = match metadata::artifact_size(path) {
            Ok(size) => size,
            Err(e) => {
                outcome.io_failure(&e);
                return outcome.finish(options.strict_mode);
            }
        };

        if let Some(max) = options.max_file_size {
            if size > max {
                outcome.error_with(
                    ErrorCode::FileTooLarge,
                    Severity::High,
                    format!("artifact is {size} bytes, exceeding the {max} byte limit"),
                    json!({ "size": size, "max_file_size": max }),
                );
            }
        }

        let detection = match format::detect(path) {
            Ok(detection) => detection,
            Err(e) => {
                outcome.io_failure(&e);
                return outcome.finish(options.strict_mode);
            }
        };

        check_format(detection, options, &mut outcome);

        if options.check_integrity && path.is_file() {
            check_integrity(size, detection, &mut outcome);
        }

        if let Some(expected) = &options.expected_checksum {
            match checksum::verify_file_checksum(path, expected) {
                Ok(true) => {}
                Ok(false) => {
                    let actual = checksum::file_checksum(path).unwrap_or_default();
                    outcome.error_with(
                        ErrorCode::ChecksumMismatch,
                        Severity::Critical,
                        "checksum does not match the expected value",
                        json!({ "expected": expected, "actual": actual }),
                    );
                }
                Err(e) => outcome.io_failure(&e),
            }
        }

        match metadata::extract(path, detection) {
            Ok(meta) => outcome.metadata = Some(meta),
            Err(e) => outcome.io_failure(&e),
        }

        let outcome = outcome.finish(options.strict_mode);
        debug!(
            path = %path.display(),
            valid = outcome.is_valid,
            errors = outcome.errors.len(),
            warnings = outcome.warnings.len(),
            "Validation finished"
        );
        outcome
    }

    /// Detect the format of an artifact.
    pub fn detect_format(&self, path: &Path) -> InspectResult<ModelFormat> {
        format::detect(path).map(|d| d.format)
    }

    /// Extract metadata for an artifact.
    pub fn extract_metadata(&self, path: &Path) -> InspectResult<FileMetadata> {
        metadata::extract(path, format::detect(path)?)
    }

    /// Compare a file's SHA-256 checksum with `expected`, ignoring case.
    pub fn verify_checksum(&self, path: &Path, expected: &str) -> InspectResult<bool> {
        checksum::verify_file_checksum(path, expected)
    }

    /// Scan an artifact for dangerous content.
    pub fn scan_for_security(&self, path: &Path) -> ValidationOutcome {
        security::scan(path)
    }

    /// Judge whether an artifact fits `platform`.
    pub fn check_compatibility(
        &self,
        path: &Path,
        platform: &Platform,
        framework: Option<Framework>,
    ) -> CompatibilityVerdict {
        let inspected = format::detect(path)
            .and_then(|d| metadata::artifact_size(path).map(|size| (d.format, size)));

        match inspected {
            Ok((format, size)) => compatibility::assess(format, size, platform, framework),
            Err(e) => CompatibilityVerdict::unreadable(
                platform.clone(),
                framework,
                format!("{}: {e}", e.code()),
            ),
        }
    }

    /// Check that an artifact looks loadable by `framework`.
    pub fn validate_loadable(&self, path: &Path, framework: Framework) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::new();

        let detection = match format::detect(path) {
            Ok(detection) => detection,
            Err(e) => {
                outcome.io_failure(&e);
                return outcome.finish(false);
            }
        };

        if path.is_file() {
            match null_ratio(path) {
                Ok(None) => outcome.error(
                    ErrorCode::EmptyFile,
                    Severity::Critical,
                    "artifact is empty",
                ),
                Ok(Some(ratio)) if ratio > NULL_BYTE_RATIO => outcome.error_with(
                    ErrorCode::CorruptedFile,
                    Severity::Critical,
                    "artifact content is almost entirely null bytes",
                    json!({ "null_ratio": ratio }),
                ),
                Ok(Some(_)) => {}
                Err(e) => {
                    outcome.io_failure(&e);
                    return outcome.finish(false);
                }
            }
        }

        if detection.format == ModelFormat::Unknown {
            outcome.error(
                ErrorCode::UnknownFormat,
                Severity::High,
                "cannot determine how to load an artifact of unknown format",
            );
        } else if !framework.can_load(detection.format) {
            let implied = detection
                .format
                .framework()
                .map_or_else(|| "unknown".to_string(), |f| f.to_string());
            outcome.warn(
                WarningCode::FrameworkMismatch,
                format!(
                    "{} artifacts are produced by {implied}, not {framework}",
                    detection.format
                ),
                Some("convert the model or load it with the matching framework"),
            );
        }

        outcome.finish(false)
    }
}

fn check_format(detection: Detection, options: &ValidationOptions, outcome: &mut ValidationOutcome) {
    let format = detection.format;

    if !options.allows(format) {
        outcome.error_with(
            ErrorCode::FormatNotAllowed,
            Severity::High,
            format!("format {format} is not in the allowed set"),
            json!({ "format": format }),
        );
    }

    if format == ModelFormat::Unknown {
        if options.strict_mode {
            outcome.error(
                ErrorCode::UnknownFormat,
                Severity::Critical,
                "artifact format could not be determined",
            );
        } else {
            outcome.warn(
                WarningCode::UnknownFormat,
                "artifact format could not be determined",
                Some("use a recognised file extension or a supported format"),
            );
        }
    }
}

fn check_integrity(size: u64, detection: Detection, outcome: &mut ValidationOutcome) {
    if size == 0 {
        outcome.error(ErrorCode::EmptyFile, Severity::Critical, "artifact is empty");
        return;
    }

    if detection.by == DetectedBy::Extension && detection.format.has_signature() {
        outcome.error(
            ErrorCode::InvalidStructure,
            Severity::Medium,
            format!(
                "file extension suggests {} but the file header does not match",
                detection.format
            ),
        );
    }
}

/// Ratio of null bytes in the leading sample, or `None` for an empty file.
fn null_ratio(path: &Path) -> Result<Option<f64>, InspectError> {
    let file = File::open(path).map_err(|e| InspectError::from_io(path, e))?;
    let mut sample = Vec::new();
    file.take(CORRUPTION_SAMPLE_BYTES)
        .read_to_end(&mut sample)
        .map_err(|e| InspectError::from_io(path, e))?;

    if sample.is_empty() {
        return Ok(None);
    }
    let nulls = sample.iter().filter(|&&b| b == 0).count();
    Ok(Some(nulls as f64 / sample.len() as f64))
}
