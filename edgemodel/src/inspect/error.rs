//! Error types for the inspector.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::outcome::ErrorCode;

/// Result type for inspector operations.
pub type InspectResult<T> = Result<T, InspectError>;

/// I/O failures while inspecting an artifact, classified by cause.
#[derive(Debug, Error)]
pub enum InspectError {
    /// The file or directory does not exist.
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf, source: io::Error },

    /// The process may not read the file.
    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf, source: io::Error },

    /// The device ran out of space.
    #[error("no space left on device while accessing {}", path.display())]
    OutOfSpace { path: PathBuf, source: io::Error },

    /// Any other read failure.
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
}

impl InspectError {
    /// Classify an I/O error raised while accessing `path`.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path, source },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            io::ErrorKind::StorageFull => Self::OutOfSpace { path, source },
            _ => Self::Read { path, source },
        }
    }

    /// Stable error code for this failure class.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::FileNotFound,
            Self::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            Self::OutOfSpace { .. } => ErrorCode::OutOfSpace,
            Self::Read { .. } => ErrorCode::ReadError,
        }
    }

    /// Path that failed.
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path, .. }
            | Self::PermissionDenied { path, .. }
            | Self::OutOfSpace { path, .. }
            | Self::Read { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let path = Path::new("/models/a.onnx");
        let cases = [
            (io::ErrorKind::NotFound, ErrorCode::FileNotFound),
            (io::ErrorKind::PermissionDenied, ErrorCode::PermissionDenied),
            (io::ErrorKind::StorageFull, ErrorCode::OutOfSpace),
            (io::ErrorKind::UnexpectedEof, ErrorCode::ReadError),
        ];

        for (kind, code) in cases {
            let err = InspectError::from_io(path, io::Error::from(kind));
            assert_eq!(err.code(), code);
            assert_eq!(err.path(), path);
        }
    }

    #[test]
    fn test_display_includes_path() {
        let err = InspectError::from_io(
            Path::new("/models/missing.tflite"),
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(err.to_string().contains("/models/missing.tflite"));
    }
}
