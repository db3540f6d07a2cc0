//! Descriptive metadata for artifacts.
//!
//! Parameter counts and resource requirements are estimates derived from
//! the artifact size alone. They are good enough to rank and gate
//! deployments, not to describe the network.

use std::fs;
use std::path::Path;

use super::error::{InspectError, InspectResult};
use super::format::{self, Detection, ModelFormat};
use super::outcome::{FileMetadata, Requirements};

/// Artifacts above this size are flagged as needing a GPU.
pub const GPU_THRESHOLD_BYTES: u64 = 1024 * 1024 * 1024;

/// Total size of a file, or the recursive total of a directory bundle.
pub fn artifact_size(path: &Path) -> InspectResult<u64> {
    let meta = fs::metadata(path).map_err(|e| InspectError::from_io(path, e))?;
    if !meta.is_dir() {
        return Ok(meta.len());
    }

    let mut total = 0u64;
    let entries = fs::read_dir(path).map_err(|e| InspectError::from_io(path, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| InspectError::from_io(path, e))?;
        total += artifact_size(&entry.path())?;
    }
    Ok(total)
}

/// Extract metadata for an artifact whose format was already detected.
pub fn extract(path: &Path, detection: Detection) -> InspectResult<FileMetadata> {
    let model_size = artifact_size(path)?;
    let version = if path.is_file() {
        header_version(detection.format, &format::read_header(path)?)
    } else {
        None
    };

    Ok(FileMetadata {
        format: detection.format,
        framework: detection.format.framework(),
        version,
        model_size,
        parameters: estimate_parameters(detection.format, model_size),
        requirements: estimate_requirements(model_size),
    })
}

/// Rough parameter count: bytes divided by the typical weight width.
pub fn estimate_parameters(format: ModelFormat, model_size: u64) -> Option<u64> {
    match format {
        ModelFormat::Unknown => None,
        // GGUF checkpoints are usually 4-bit quantised.
        ModelFormat::Gguf => Some(model_size.saturating_mul(2)),
        _ => Some(model_size / 4),
    }
}

/// Memory needed to load the model and whether a GPU is advisable.
pub fn estimate_requirements(model_size: u64) -> Requirements {
    Requirements {
        min_memory_bytes: model_size.saturating_add(model_size / 2),
        gpu_recommended: model_size > GPU_THRESHOLD_BYTES,
    }
}

fn header_version(format: ModelFormat, header: &[u8]) -> Option<String> {
    match format {
        ModelFormat::Gguf => {
            let bytes: [u8; 4] = header.get(4..8)?.try_into().ok()?;
            Some(format!("gguf v{}", u32::from_le_bytes(bytes)))
        }
        ModelFormat::Onnx => header.get(1).map(|ir| format!("ir_version {ir}")),
        ModelFormat::KerasH5 => header.get(8).map(|v| format!("hdf5 superblock v{v}")),
        _ => None,
    }
}
