//! Content scanning for suspicious payloads.
//!
//! Model files should contain weights, not programs. The scanner looks for
//! two things: text that invokes a shell or evaluates code, and native
//! executable headers at the start of a file. The text scan only runs on
//! content that decodes as UTF-8; binary weights are skipped.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use regex::RegexSet;
use serde_json::json;
use tracing::{debug, warn};

use super::error::InspectError;
use super::metadata::artifact_size;
use super::outcome::{ErrorCode, Severity, ValidationOutcome, WarningCode};

/// Files larger than this are flagged as suspicious (10 GiB).
pub const SUSPICIOUS_SIZE_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Maximum number of leading bytes inspected for text patterns (16 MiB).
pub const SCAN_WINDOW_BYTES: u64 = 16 * 1024 * 1024;

/// (label, pattern) pairs for dangerous operations.
const DANGEROUS_PATTERNS: &[(&str, &str)] = &[
    ("shell call via os.system", r"\bos\.system\s*\("),
    ("subprocess invocation", r"\bsubprocess\.(?:Popen|call|run|check_output)\b"),
    ("shell binary path", r"/bin/(?:ba|z)?sh\b"),
    ("dynamic eval", r"\beval\s*\("),
    ("dynamic exec", r"\bexec\s*\("),
    ("dynamic import", r"__import__\s*\("),
    ("sudo invocation", r"\bsudo\s+\S"),
    ("setuid or world-writable chmod", r"\bchmod\s+(?:[ugoa]*\+s\b|0?777\b)"),
    ("setuid call", r"\bsetuid\s*\("),
    ("download piped to shell", r"\b(?:curl|wget)\b[^|\n]*\|\s*(?:ba|z)?sh\b"),
];

const EXECUTABLE_MAGIC: &[(&str, &[u8])] = &[
    ("ELF", b"\x7fELF"),
    ("PE/COFF", b"MZ"),
    ("Mach-O", b"\xfe\xed\xfa\xce"),
    ("Mach-O", b"\xfe\xed\xfa\xcf"),
    ("Mach-O", b"\xce\xfa\xed\xfe"),
    ("Mach-O", b"\xcf\xfa\xed\xfe"),
];

fn dangerous_patterns() -> &'static RegexSet {
    static PATTERNS: OnceLock<RegexSet> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        RegexSet::new(DANGEROUS_PATTERNS.iter().map(|(_, pattern)| *pattern)).unwrap()
    })
}

/// Labels of every dangerous pattern that matches `text`.
pub fn matching_patterns(text: &str) -> Vec<&'static str> {
    dangerous_patterns()
        .matches(text)
        .into_iter()
        .map(|i| DANGEROUS_PATTERNS[i].0)
        .collect()
}

/// Name of the executable format `bytes` starts with, if any.
pub fn executable_signature(bytes: &[u8]) -> Option<&'static str> {
    EXECUTABLE_MAGIC
        .iter()
        .find(|(_, magic)| bytes.starts_with(magic))
        .map(|(name, _)| *name)
}

/// Scan a file or every file inside a directory bundle.
pub fn scan(path: &Path) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::new();

    match artifact_size(path) {
        Ok(size) if size > SUSPICIOUS_SIZE_BYTES => {
            warn!(path = %path.display(), size, "Unusually large artifact");
            outcome.warn(
                WarningCode::LargeFile,
                format!("artifact is {size} bytes, above the {SUSPICIOUS_SIZE_BYTES} byte threshold"),
                Some("confirm the artifact source before deploying"),
            );
        }
        Ok(_) => {}
        Err(e) => {
            outcome.io_failure(&e);
            return outcome.finish(false);
        }
    }

    if path.is_dir() {
        scan_dir(path, &mut outcome);
    } else {
        scan_file(path, &mut outcome);
    }

    outcome.finish(false)
}

fn scan_dir(dir: &Path, outcome: &mut ValidationOutcome) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            outcome.io_failure(&InspectError::from_io(dir, e));
            return;
        }
    };

    for entry in entries {
        match entry {
            Ok(entry) if entry.path().is_dir() => scan_dir(&entry.path(), outcome),
            Ok(entry) => scan_file(&entry.path(), outcome),
            Err(e) => outcome.io_failure(&InspectError::from_io(dir, e)),
        }
    }
}

fn scan_file(path: &Path, outcome: &mut ValidationOutcome) {
    let window = match read_window(path) {
        Ok(window) => window,
        Err(e) => {
            outcome.io_failure(&e);
            return;
        }
    };

    if let Some(kind) = executable_signature(&window) {
        warn!(path = %path.display(), kind, "Embedded executable header");
        outcome.error_with(
            ErrorCode::EmbeddedExecutable,
            Severity::High,
            format!("{} starts with a {kind} executable header", path.display()),
            json!({ "path": path.display().to_string(), "kind": kind }),
        );
    }

    let Some(text) = decodable_text(&window) else {
        debug!(path = %path.display(), "Binary content, text patterns not checked");
        return;
    };

    let matches = matching_patterns(text);
    if !matches.is_empty() {
        warn!(path = %path.display(), patterns = ?matches, "Dangerous content patterns");
        outcome.error_with(
            ErrorCode::DangerousContent,
            Severity::Critical,
            format!("{} contains dangerous operations: {}", path.display(), matches.join(", ")),
            json!({ "path": path.display().to_string(), "patterns": matches }),
        );
    }
}

fn read_window(path: &Path) -> Result<Vec<u8>, InspectError> {
    let file = File::open(path).map_err(|e| InspectError::from_io(path, e))?;
    let mut window = Vec::new();
    file.take(SCAN_WINDOW_BYTES)
        .read_to_end(&mut window)
        .map_err(|e| InspectError::from_io(path, e))?;
    Ok(window)
}

/// UTF-8 view of a window, tolerating a multi-byte character cut off by
/// the window boundary.
fn decodable_text(window: &[u8]) -> Option<&str> {
    match std::str::from_utf8(window) {
        Ok(text) => Some(text),
        Err(e) if e.error_len().is_none() => std::str::from_utf8(&window[..e.valid_up_to()]).ok(),
        Err(_) => None,
    }
}
