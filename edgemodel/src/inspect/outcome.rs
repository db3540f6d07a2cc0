//! Validation results produced by the inspector.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::error::InspectError;
use super::format::{Framework, ModelFormat};

/// Severity tier of a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Stable codes for validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    FileNotFound,
    PermissionDenied,
    OutOfSpace,
    ReadError,
    FileTooLarge,
    FormatNotAllowed,
    UnknownFormat,
    ChecksumMismatch,
    EmptyFile,
    CorruptedFile,
    InvalidStructure,
    DangerousContent,
    EmbeddedExecutable,
}

impl ErrorCode {
    /// Get the wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::OutOfSpace => "OUT_OF_SPACE",
            Self::ReadError => "READ_ERROR",
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::FormatNotAllowed => "FORMAT_NOT_ALLOWED",
            Self::UnknownFormat => "UNKNOWN_FORMAT",
            Self::ChecksumMismatch => "CHECKSUM_MISMATCH",
            Self::EmptyFile => "EMPTY_FILE",
            Self::CorruptedFile => "CORRUPTED_FILE",
            Self::InvalidStructure => "INVALID_STRUCTURE",
            Self::DangerousContent => "DANGEROUS_CONTENT",
            Self::EmbeddedExecutable => "EMBEDDED_EXECUTABLE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable codes for validation warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    UnknownFormat,
    LargeFile,
    FrameworkMismatch,
}

impl WarningCode {
    /// Get the wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownFormat => "UNKNOWN_FORMAT",
            Self::LargeFile => "LARGE_FILE",
            Self::FrameworkMismatch => "FRAMEWORK_MISMATCH",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failing finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub code: ErrorCode,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// A non-failing finding (fails only under strict mode).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationWarning {
    pub code: WarningCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Resources an artifact needs at load time (estimates).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirements {
    pub min_memory_bytes: u64,
    pub gpu_recommended: bool,
}

/// Descriptive metadata extracted from an artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMetadata {
    pub format: ModelFormat,
    pub framework: Option<Framework>,
    /// Format-level version marker, when the header carries one.
    pub version: Option<String>,
    /// Size in bytes (recursive total for directory bundles).
    pub model_size: u64,
    /// Heuristic parameter count.
    pub parameters: Option<u64>,
    pub requirements: Requirements,
}

/// Result of validating an artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FileMetadata>,
}

impl ValidationOutcome {
    /// Create an empty outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error.
    pub fn error(&mut self, code: ErrorCode, severity: Severity, message: impl Into<String>) {
        self.errors.push(ValidationError {
            code,
            message: message.into(),
            severity,
            details: None,
        });
    }

    /// Record an error with structured details.
    pub fn error_with(
        &mut self,
        code: ErrorCode,
        severity: Severity,
        message: impl Into<String>,
        details: Value,
    ) {
        self.errors.push(ValidationError {
            code,
            message: message.into(),
            severity,
            details: Some(details),
        });
    }

    /// Record a warning.
    pub fn warn(&mut self, code: WarningCode, message: impl Into<String>, suggestion: Option<&str>) {
        self.warnings.push(ValidationWarning {
            code,
            message: message.into(),
            suggestion: suggestion.map(str::to_string),
        });
    }

    /// Record an I/O failure as a critical error.
    pub fn io_failure(&mut self, err: &InspectError) {
        self.error(err.code(), Severity::Critical, err.to_string());
    }

    /// Append another outcome's findings.
    pub fn absorb(&mut self, other: ValidationOutcome) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        if self.metadata.is_none() {
            self.metadata = other.metadata;
        }
    }

    /// Settle `is_valid`: no errors, and no warnings either under strict mode.
    pub fn finish(mut self, strict: bool) -> Self {
        self.is_valid = self.errors.is_empty() && (!strict || self.warnings.is_empty());
        self
    }

    /// Whether any error is critical.
    pub fn has_critical(&self) -> bool {
        self.errors.iter().any(|e| e.severity == Severity::Critical)
    }

    /// Number of critical errors.
    pub fn critical_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| e.severity == Severity::Critical)
            .count()
    }

    /// Whether an error with the given code was recorded.
    pub fn has_error(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Whether a warning with the given code was recorded.
    pub fn has_warning(&self, code: WarningCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }

    /// One-line summary of the errors, for logs and failure results.
    pub fn summary(&self) -> String {
        if self.errors.is_empty() && self.warnings.is_empty() {
            return "no findings".to_string();
        }
        let mut parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{} ({}): {}", e.code, e.severity, e.message))
            .collect();
        parts.extend(
            self.warnings
                .iter()
                .map(|w| format!("{} (warning): {}", w.code, w.message)),
        );
        parts.join("; ")
    }
}
