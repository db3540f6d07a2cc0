//! Integrity and format inspection of local artifacts.
//!
//! Given a file or directory bundle, the inspector:
//! - Detects the serialization format (`format`)
//! - Extracts size-based metadata estimates (`metadata`)
//! - Verifies SHA-256 checksums (`checksum`)
//! - Scans for shell and code-execution payloads (`security`)
//! - Judges fitness for a target platform (`compatibility`)
//!
//! Expected I/O failures never escape [`Inspector::validate`]; they are
//! recorded as critical errors carrying a stable [`ErrorCode`].

mod checksum;
mod compatibility;
mod error;
mod format;
mod inspector;
mod metadata;
mod options;
mod outcome;
mod security;

pub use checksum::{file_checksum, verify_file_checksum};
pub use compatibility::{assess, CompatibilityVerdict, Platform, PlatformProfile};
pub use error::{InspectError, InspectResult};
pub use format::{
    detect, detect_bytes, DetectedBy, Detection, Framework, ModelFormat, ParseNameError,
    HEADER_LEN,
};
pub use inspector::{Inspector, CORRUPTION_SAMPLE_BYTES, NULL_BYTE_RATIO};
pub use metadata::{artifact_size, estimate_parameters, estimate_requirements, GPU_THRESHOLD_BYTES};
pub use options::ValidationOptions;
pub use outcome::{
    ErrorCode, FileMetadata, Requirements, Severity, ValidationError, ValidationOutcome,
    ValidationWarning, WarningCode,
};
pub use security::{
    executable_signature, matching_patterns, SCAN_WINDOW_BYTES, SUSPICIOUS_SIZE_BYTES,
};
