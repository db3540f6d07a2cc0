//! Validation configuration.

use std::collections::BTreeSet;

use super::format::ModelFormat;

/// Options controlling [`Inspector::validate`](super::Inspector::validate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Treat warnings as failures and unknown formats as critical.
    pub strict_mode: bool,

    /// Largest accepted artifact size in bytes.
    pub max_file_size: Option<u64>,

    /// Formats accepted when set.
    pub allowed_formats: Option<BTreeSet<ModelFormat>>,

    /// Check structural integrity (non-empty, signature present).
    pub check_integrity: bool,

    /// Expected SHA-256 checksum, hex encoded.
    pub expected_checksum: Option<String>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            strict_mode: false,
            max_file_size: None,
            allowed_formats: None,
            check_integrity: true,
            expected_checksum: None,
        }
    }
}

impl ValidationOptions {
    pub fn strict() -> Self {
        Self::default().with_strict_mode(true)
    }

    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn with_max_file_size(mut self, max: u64) -> Self {
        self.max_file_size = Some(max);
        self
    }

    pub fn with_allowed_formats(mut self, formats: impl IntoIterator<Item = ModelFormat>) -> Self {
        self.allowed_formats = Some(formats.into_iter().collect());
        self
    }

    pub fn with_integrity_check(mut self, enabled: bool) -> Self {
        self.check_integrity = enabled;
        self
    }

    pub fn with_expected_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.expected_checksum = Some(checksum.into());
        self
    }

    /// Whether `format` passes the allow-list.
    pub fn allows(&self, format: ModelFormat) -> bool {
        self.allowed_formats
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ValidationOptions::default();
        assert!(!options.strict_mode);
        assert!(options.check_integrity);
        assert!(options.max_file_size.is_none());
        assert!(options.allows(ModelFormat::Unknown));
    }

    #[test]
    fn test_allow_list() {
        let options = ValidationOptions::strict()
            .with_allowed_formats([ModelFormat::TfLite, ModelFormat::Onnx]);
        assert!(options.strict_mode);
        assert!(options.allows(ModelFormat::Onnx));
        assert!(!options.allows(ModelFormat::PyTorch));
    }
}
