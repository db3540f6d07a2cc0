//! Query filters for listing artifacts.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::record::{ArtifactRecord, Capability, ModelType};
use crate::inspect::Framework;
use crate::version;

/// Field to sort listings by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Name,
    /// Semantic-version precedence, falling back to string order.
    Version,
    FileSize,
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Criteria for `find_all`. Every set criterion must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactFilter {
    /// Exact family name.
    pub name: Option<String>,
    pub model_type: Option<ModelType>,
    pub framework: Option<Framework>,
    /// Records must carry all of these.
    pub capabilities: BTreeSet<Capability>,
    /// Records must carry all of these.
    pub tags: BTreeSet<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    /// Case-insensitive text matched against name, description and tags.
    pub search: Option<String>,
    pub offset: usize,
    pub limit: Option<usize>,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl ArtifactFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_model_type(mut self, model_type: ModelType) -> Self {
        self.model_type = Some(model_type);
        self
    }

    pub fn with_framework(mut self, framework: Framework) -> Self {
        self.framework = Some(framework);
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_size_range(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    pub fn sorted_by(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort = key;
        self.direction = direction;
        self
    }

    /// Whether a record satisfies every criterion.
    pub fn matches(&self, record: &ArtifactRecord) -> bool {
        self.name.as_ref().map_or(true, |n| &record.name == n)
            && self.model_type.map_or(true, |t| record.model_type == t)
            && self.framework.map_or(true, |f| record.framework == f)
            && self.capabilities.is_subset(&record.capabilities)
            && self.tags.is_subset(&record.tags)
            && self.min_size.map_or(true, |min| record.file_size >= min)
            && self.max_size.map_or(true, |max| record.file_size <= max)
            && self.search.as_deref().map_or(true, |q| matches_text(record, q))
    }

    /// Filter, sort and paginate `records`.
    pub fn apply<'a>(&self, records: impl IntoIterator<Item = &'a ArtifactRecord>) -> Vec<ArtifactRecord> {
        let mut selected: Vec<ArtifactRecord> = records
            .into_iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();

        selected.sort_by(|a, b| {
            let ordering = compare_by(self.sort, a, b).then_with(|| a.id.cmp(&b.id));
            match self.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });

        selected
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

/// Case-insensitive free-text match.
pub fn matches_text(record: &ArtifactRecord, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    record.name.to_lowercase().contains(&query)
        || record.description.to_lowercase().contains(&query)
        || record.tags.iter().any(|t| t.to_lowercase().contains(&query))
}

fn compare_by(key: SortKey, a: &ArtifactRecord, b: &ArtifactRecord) -> Ordering {
    match key {
        SortKey::Name => a.name.cmp(&b.name).then_with(|| compare_versions(a, b)),
        SortKey::Version => compare_versions(a, b),
        SortKey::FileSize => a.file_size.cmp(&b.file_size),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

fn compare_versions(a: &ArtifactRecord, b: &ArtifactRecord) -> Ordering {
    match version::compare(&a.version, &b.version) {
        Ok(ordering) => ordering,
        Err(_) => a.version.cmp(&b.version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::fixtures::new_artifact;
    use crate::store::ArtifactId;
    use chrono::Utc;

    fn records() -> Vec<ArtifactRecord> {
        let now = Utc::now();
        let mut ad = new_artifact("ad-detector", "1.10.0");
        ad.capabilities.insert(Capability::AdDetection);
        ad.tags.insert("prod".to_string());
        ad.file_size = 5_000;

        let mut ad_old = new_artifact("ad-detector", "1.2.0");
        ad_old.capabilities.insert(Capability::AdDetection);
        ad_old.file_size = 4_000;

        let mut faces = new_artifact("face-finder", "0.3.0");
        faces.capabilities.insert(Capability::FaceDetection);
        faces.framework = Framework::Onnx;
        faces.description = "Finds faces in camera frames".to_string();
        faces.file_size = 20_000;

        [ad, ad_old, faces]
            .into_iter()
            .enumerate()
            .map(|(i, data)| ArtifactRecord::from_new(ArtifactId(i as u64 + 1), data, now))
            .collect()
    }

    fn names(found: &[ArtifactRecord]) -> Vec<String> {
        found.iter().map(ArtifactRecord::key).collect()
    }

    #[test]
    fn test_default_sorts_by_name_then_version() {
        let found = ArtifactFilter::new().apply(&records());
        assert_eq!(
            names(&found),
            ["ad-detector@1.2.0", "ad-detector@1.10.0", "face-finder@0.3.0"]
        );
    }

    #[test]
    fn test_criteria_are_conjunctive() {
        let all = records();

        let found = ArtifactFilter::new()
            .with_capability(Capability::AdDetection)
            .with_tag("prod")
            .apply(&all);
        assert_eq!(names(&found), ["ad-detector@1.10.0"]);

        let found = ArtifactFilter::new().with_framework(Framework::Onnx).apply(&all);
        assert_eq!(names(&found), ["face-finder@0.3.0"]);

        let found = ArtifactFilter::new()
            .with_size_range(Some(4_500), Some(10_000))
            .apply(&all);
        assert_eq!(names(&found), ["ad-detector@1.10.0"]);
    }

    #[test]
    fn test_search_matches_description() {
        let found = ArtifactFilter::new().with_search("CAMERA").apply(&records());
        assert_eq!(names(&found), ["face-finder@0.3.0"]);
    }

    #[test]
    fn test_sort_and_page() {
        let found = ArtifactFilter::new()
            .sorted_by(SortKey::FileSize, SortDirection::Descending)
            .with_page(1, 1)
            .apply(&records());
        assert_eq!(names(&found), ["ad-detector@1.10.0"]);
    }
}
