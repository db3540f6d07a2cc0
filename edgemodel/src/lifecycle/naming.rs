//! Deterministic on-disk names for installed artifacts.

use reqwest::Url;

/// Extension used when the source URL carries none.
pub const DEFAULT_EXTENSION: &str = "bin";

/// Replace every character that is not ASCII alphanumeric with `_`.
pub fn sanitize_segment(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// File name for `name` at `version` retrieved from `url`.
///
/// `<name>_v<version>.<ext>`, with name and version sanitized and the
/// extension taken from the last path segment of the URL.
///
/// # Example
///
/// ```
/// use edgemodel::lifecycle::artifact_file_name;
///
/// let file = artifact_file_name("ad-detector", "1.0.0", "https://m.example.com/v1/model.tflite?sig=x");
/// assert_eq!(file, "ad_detector_v1_0_0.tflite");
/// ```
pub fn artifact_file_name(name: &str, version: &str, url: &str) -> String {
    format!(
        "{}_v{}.{}",
        sanitize_segment(name),
        sanitize_segment(version),
        source_extension(url).unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
    )
}

fn source_extension(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    };
    let last = path.rsplit('/').next()?;
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
