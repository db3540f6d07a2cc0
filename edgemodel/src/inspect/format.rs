//! Model serialization formats and their detection.
//!
//! Detection is ordered and the first match wins:
//!
//! 1. A directory holding `saved_model.pb` (or `.pbtxt`) and a `variables/`
//!    sub-directory is a SavedModel bundle.
//! 2. The leading bytes of a file are matched against known signatures.
//! 3. The file extension is mapped to a format.
//! 4. Anything else is [`ModelFormat::Unknown`].
//!
//! Protobuf-based formats carry no magic number, so ONNX and frozen
//! TensorFlow graphs are recognised from their leading field tags. This is
//! a heuristic and can be fooled by arbitrary protobuf payloads.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error::{InspectError, InspectResult};

/// Number of leading bytes read for signature matching.
pub const HEADER_LEN: usize = 64;

const TFLITE_MAGIC: &[u8; 4] = b"TFL3";
const GGUF_MAGIC: &[u8; 4] = b"GGUF";
const HDF5_MAGIC: &[u8; 8] = b"\x89HDF\r\n\x1a\n";
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Serialization format of a model artifact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    /// TensorFlow SavedModel directory bundle.
    SavedModel,
    /// TensorFlow Lite flatbuffer.
    TfLite,
    /// Frozen TensorFlow GraphDef protobuf.
    TfGraph,
    Onnx,
    /// PyTorch zip archive (`torch.save`).
    PyTorch,
    /// Keras v3 zip archive.
    Keras,
    /// Legacy Keras HDF5 file.
    KerasH5,
    Gguf,
    Safetensors,
    CoreMl,
    Unknown,
}

impl ModelFormat {
    /// Every format, in declaration order.
    pub const ALL: [ModelFormat; 11] = [
        Self::SavedModel,
        Self::TfLite,
        Self::TfGraph,
        Self::Onnx,
        Self::PyTorch,
        Self::Keras,
        Self::KerasH5,
        Self::Gguf,
        Self::Safetensors,
        Self::CoreMl,
        Self::Unknown,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SavedModel => "saved_model",
            Self::TfLite => "tflite",
            Self::TfGraph => "tf_graph",
            Self::Onnx => "onnx",
            Self::PyTorch => "pytorch",
            Self::Keras => "keras",
            Self::KerasH5 => "keras_h5",
            Self::Gguf => "gguf",
            Self::Safetensors => "safetensors",
            Self::CoreMl => "coreml",
            Self::Unknown => "unknown",
        }
    }

    /// Framework that produces and loads this format.
    pub fn framework(&self) -> Option<Framework> {
        match self {
            Self::SavedModel | Self::TfGraph => Some(Framework::TensorFlow),
            Self::TfLite => Some(Framework::TensorFlowLite),
            Self::Onnx => Some(Framework::Onnx),
            Self::PyTorch | Self::Safetensors => Some(Framework::PyTorch),
            Self::Keras | Self::KerasH5 => Some(Framework::Keras),
            Self::Gguf => Some(Framework::LlamaCpp),
            Self::CoreMl => Some(Framework::CoreMl),
            Self::Unknown => None,
        }
    }

    /// Whether the format has a byte signature that a well-formed file
    /// must start with.
    pub fn has_signature(&self) -> bool {
        matches!(
            self,
            Self::TfLite
                | Self::Gguf
                | Self::KerasH5
                | Self::Keras
                | Self::PyTorch
                | Self::Safetensors
        )
    }

    /// Map a file extension (without the dot, any case) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let format = match ext.to_ascii_lowercase().as_str() {
            "tflite" => Self::TfLite,
            "pb" => Self::TfGraph,
            "onnx" => Self::Onnx,
            "pt" | "pth" => Self::PyTorch,
            "keras" => Self::Keras,
            "h5" | "hdf5" => Self::KerasH5,
            "gguf" => Self::Gguf,
            "safetensors" => Self::Safetensors,
            "mlmodel" => Self::CoreMl,
            _ => return None,
        };
        Some(format)
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown format or framework name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseNameError {
    kind: &'static str,
    value: String,
}

impl ParseNameError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl FromStr for ModelFormat {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .or_else(|| match normalized.as_str() {
                "savedmodel" => Some(Self::SavedModel),
                "tensorflow_lite" => Some(Self::TfLite),
                "h5" | "hdf5" => Some(Self::KerasH5),
                "torch" | "pt" => Some(Self::PyTorch),
                "mlmodel" | "core_ml" => Some(Self::CoreMl),
                _ => None,
            })
            .ok_or_else(|| ParseNameError::new("format", s))
    }
}

/// ML framework an artifact is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framework {
    TensorFlow,
    TensorFlowLite,
    PyTorch,
    Onnx,
    Keras,
    CoreMl,
    LlamaCpp,
}

impl Framework {
    pub const ALL: [Framework; 7] = [
        Self::TensorFlow,
        Self::TensorFlowLite,
        Self::PyTorch,
        Self::Onnx,
        Self::Keras,
        Self::CoreMl,
        Self::LlamaCpp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TensorFlow => "tensorflow",
            Self::TensorFlowLite => "tensorflow_lite",
            Self::PyTorch => "pytorch",
            Self::Onnx => "onnx",
            Self::Keras => "keras",
            Self::CoreMl => "coreml",
            Self::LlamaCpp => "llama_cpp",
        }
    }

    /// Whether this framework can load artifacts of `format`.
    pub fn can_load(&self, format: ModelFormat) -> bool {
        use ModelFormat::*;
        match self {
            Self::TensorFlow => matches!(format, SavedModel | TfGraph | Keras | KerasH5),
            Self::TensorFlowLite => format == TfLite,
            Self::PyTorch => matches!(format, PyTorch | Safetensors),
            Self::Onnx => format == Onnx,
            Self::Keras => matches!(format, Keras | KerasH5 | SavedModel),
            Self::CoreMl => format == CoreMl,
            Self::LlamaCpp => format == Gguf,
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .or_else(|| match normalized.as_str() {
                "tf" => Some(Self::TensorFlow),
                "tflite" | "tf_lite" => Some(Self::TensorFlowLite),
                "torch" => Some(Self::PyTorch),
                "core_ml" => Some(Self::CoreMl),
                "llamacpp" | "llama.cpp" | "gguf" => Some(Self::LlamaCpp),
                _ => None,
            })
            .ok_or_else(|| ParseNameError::new("framework", s))
    }
}

/// How a format was recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedBy {
    Directory,
    Signature,
    Extension,
    Nothing,
}

/// A detected format together with the rule that matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub format: ModelFormat,
    pub by: DetectedBy,
}

impl Detection {
    fn new(format: ModelFormat, by: DetectedBy) -> Self {
        Self { format, by }
    }
}

/// Detect the format of the artifact at `path`.
pub fn detect(path: &Path) -> InspectResult<Detection> {
    let meta = std::fs::metadata(path).map_err(|e| InspectError::from_io(path, e))?;

    if meta.is_dir() {
        if is_saved_model_dir(path) {
            return Ok(Detection::new(ModelFormat::SavedModel, DetectedBy::Directory));
        }
        return Ok(Detection::new(ModelFormat::Unknown, DetectedBy::Nothing));
    }

    let header = read_header(path)?;
    let extension = path.extension().and_then(|e| e.to_str());
    Ok(detect_bytes(&header, extension))
}

/// Detect a format from leading bytes and an optional file extension.
pub fn detect_bytes(header: &[u8], extension: Option<&str>) -> Detection {
    if let Some(format) = match_signature(header, extension) {
        return Detection::new(format, DetectedBy::Signature);
    }
    if let Some(format) = extension.and_then(ModelFormat::from_extension) {
        return Detection::new(format, DetectedBy::Extension);
    }
    Detection::new(ModelFormat::Unknown, DetectedBy::Nothing)
}

/// Read up to [`HEADER_LEN`] leading bytes of a file.
pub fn read_header(path: &Path) -> InspectResult<Vec<u8>> {
    let file = File::open(path).map_err(|e| InspectError::from_io(path, e))?;
    let mut header = Vec::with_capacity(HEADER_LEN);
    file.take(HEADER_LEN as u64)
        .read_to_end(&mut header)
        .map_err(|e| InspectError::from_io(path, e))?;
    Ok(header)
}

fn is_saved_model_dir(path: &Path) -> bool {
    let has_manifest =
        path.join("saved_model.pb").is_file() || path.join("saved_model.pbtxt").is_file();
    has_manifest && path.join("variables").is_dir()
}

fn match_signature(header: &[u8], extension: Option<&str>) -> Option<ModelFormat> {
    // TFLite flatbuffers carry the identifier at offset 4; some exporters
    // write it at the start of the buffer.
    if header.starts_with(TFLITE_MAGIC) || header.get(4..8) == Some(TFLITE_MAGIC.as_slice()) {
        return Some(ModelFormat::TfLite);
    }
    if header.starts_with(GGUF_MAGIC) {
        return Some(ModelFormat::Gguf);
    }
    if header.starts_with(HDF5_MAGIC) {
        return Some(ModelFormat::KerasH5);
    }
    if header.starts_with(ZIP_MAGIC) {
        let is_keras = extension.is_some_and(|e| e.eq_ignore_ascii_case("keras"));
        return Some(if is_keras {
            ModelFormat::Keras
        } else {
            ModelFormat::PyTorch
        });
    }
    if is_safetensors(header) {
        return Some(ModelFormat::Safetensors);
    }
    if is_onnx(header) {
        return Some(ModelFormat::Onnx);
    }
    if is_graph_def(header) {
        return Some(ModelFormat::TfGraph);
    }
    None
}

/// safetensors: little-endian u64 JSON header length, then `{`.
fn is_safetensors(header: &[u8]) -> bool {
    let Some(len_bytes) = header.get(..8) else {
        return false;
    };
    let mut buf = [0u8; 8];
    buf.copy_from_slice(len_bytes);
    let json_len = u64::from_le_bytes(buf);
    json_len > 1 && json_len < 100 * 1024 * 1024 && header.get(8) == Some(&b'{')
}

/// ONNX ModelProto opens with `ir_version` (field 1, varint) followed by
/// another top-level field.
fn is_onnx(header: &[u8]) -> bool {
    match header {
        [0x08, ir_version, next_tag, ..] => {
            (1..=20).contains(ir_version)
                && matches!(*next_tag, 0x12 | 0x1a | 0x22 | 0x2a | 0x32 | 0x3a | 0x42)
        }
        _ => false,
    }
}

/// GraphDef opens with a `node` entry (field 1, length-delimited) whose
/// first field is the node `name` (also field 1, length-delimited).
fn is_graph_def(header: &[u8]) -> bool {
    if header.first() != Some(&0x0a) {
        return false;
    }
    let Some(varint_len) = varint_len(&header[1..]) else {
        return false;
    };
    header.get(1 + varint_len) == Some(&0x0a)
}

fn varint_len(bytes: &[u8]) -> Option<usize> {
    bytes
        .iter()
        .take(10)
        .position(|b| b & 0x80 == 0)
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tflite_header() -> Vec<u8> {
        let mut header = vec![0x1c, 0x00, 0x00, 0x00];
        header.extend_from_slice(b"TFL3");
        header.extend_from_slice(&[0u8; 24]);
        header
    }

    #[test]
    fn test_tflite_signature_wins_over_extension() {
        let detection = detect_bytes(&tflite_header(), Some("onnx"));
        assert_eq!(detection.format, ModelFormat::TfLite);
        assert_eq!(detection.by, DetectedBy::Signature);

        let leading = detect_bytes(b"TFL3\x00\x00\x00\x00", Some("bin"));
        assert_eq!(leading.format, ModelFormat::TfLite);
    }

    #[test]
    fn test_zip_archive_split_by_extension() {
        let header = b"PK\x03\x04\x14\x00\x00\x00";
        assert_eq!(detect_bytes(header, Some("keras")).format, ModelFormat::Keras);
        assert_eq!(detect_bytes(header, Some("pt")).format, ModelFormat::PyTorch);
        assert_eq!(detect_bytes(header, None).format, ModelFormat::PyTorch);
    }

    #[test]
    fn test_other_signatures() {
        assert_eq!(
            detect_bytes(b"GGUF\x03\x00\x00\x00", None).format,
            ModelFormat::Gguf
        );
        assert_eq!(
            detect_bytes(b"\x89HDF\r\n\x1a\n\x00\x00", None).format,
            ModelFormat::KerasH5
        );

        let mut safetensors = 64u64.to_le_bytes().to_vec();
        safetensors.extend_from_slice(b"{\"__metadata__\":{}}");
        assert_eq!(
            detect_bytes(&safetensors, None).format,
            ModelFormat::Safetensors
        );
    }

    #[test]
    fn test_protobuf_heuristics() {
        // ir_version 7, then producer_name
        let onnx = [0x08, 0x07, 0x12, 0x07, b'p', b'y', b't', b'o', b'r', b'c', b'h'];
        assert_eq!(detect_bytes(&onnx, None).format, ModelFormat::Onnx);

        // node { name: "input" }
        let graph = [0x0a, 0x10, 0x0a, 0x05, b'i', b'n', b'p', b'u', b't'];
        assert_eq!(detect_bytes(&graph, None).format, ModelFormat::TfGraph);

        // Two-byte varint length before the name tag
        let long_graph = [0x0a, 0x96, 0x01, 0x0a, 0x01, b'x'];
        assert_eq!(detect_bytes(&long_graph, None).format, ModelFormat::TfGraph);
    }

    #[test]
    fn test_extension_fallback() {
        let detection = detect_bytes(b"plain bytes", Some("MLMODEL"));
        assert_eq!(detection.format, ModelFormat::CoreMl);
        assert_eq!(detection.by, DetectedBy::Extension);

        let unknown = detect_bytes(b"plain bytes", Some("txt"));
        assert_eq!(unknown.format, ModelFormat::Unknown);
        assert_eq!(unknown.by, DetectedBy::Nothing);
    }

    #[test]
    fn test_detect_saved_model_directory() {
        let temp = TempDir::new().unwrap();
        let bundle = temp.path().join("model");
        fs::create_dir_all(bundle.join("variables")).unwrap();
        fs::write(bundle.join("saved_model.pb"), b"\x08\x01").unwrap();

        let detection = detect(&bundle).unwrap();
        assert_eq!(detection.format, ModelFormat::SavedModel);
        assert_eq!(detection.by, DetectedBy::Directory);
    }

    #[test]
    fn test_directory_without_variables_is_unknown() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("saved_model.pb"), b"x").unwrap();

        assert_eq!(detect(temp.path()).unwrap().format, ModelFormat::Unknown);
    }

    #[test]
    fn test_detect_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = detect(&temp.path().join("missing.tflite")).unwrap_err();
        assert!(matches!(err, InspectError::NotFound { .. }));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("TFLite".parse::<ModelFormat>().unwrap(), ModelFormat::TfLite);
        assert_eq!("saved-model".parse::<ModelFormat>().unwrap(), ModelFormat::SavedModel);
        assert_eq!("torch".parse::<Framework>().unwrap(), Framework::PyTorch);
        assert_eq!(
            "TensorFlow Lite".parse::<Framework>().unwrap(),
            Framework::TensorFlowLite
        );
        assert!("caffe".parse::<Framework>().is_err());
    }

    #[test]
    fn test_framework_loads_own_formats() {
        for format in ModelFormat::ALL {
            if let Some(framework) = format.framework() {
                assert!(framework.can_load(format), "{framework} should load {format}");
            }
        }
        assert!(!Framework::TensorFlowLite.can_load(ModelFormat::Onnx));
    }
}
