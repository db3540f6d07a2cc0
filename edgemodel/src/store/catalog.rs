//! In-memory record table shared by the store implementations.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::error::{StoreError, StoreResult};
use super::filter::{matches_text, ArtifactFilter};
use super::record::{ArtifactId, ArtifactPatch, ArtifactRecord, Capability, NewArtifact};
use crate::version;

/// Records keyed by id, plus the id sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Catalog {
    next_id: u64,
    artifacts: BTreeMap<ArtifactId, ArtifactRecord>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            next_id: 1,
            artifacts: BTreeMap::new(),
        }
    }
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn by_name_and_version(&self, name: &str, version: &str) -> Option<ArtifactRecord> {
        self.artifacts
            .values()
            .find(|r| r.name == name && r.version == version)
            .cloned()
    }

    pub fn by_id(&self, id: ArtifactId) -> Option<ArtifactRecord> {
        self.artifacts.get(&id).cloned()
    }

    pub fn find_all(&self, filter: &ArtifactFilter) -> Vec<ArtifactRecord> {
        filter.apply(self.artifacts.values())
    }

    pub fn search(&self, query: &str) -> Vec<ArtifactRecord> {
        self.artifacts
            .values()
            .filter(|r| matches_text(r, query))
            .cloned()
            .collect()
    }

    pub fn by_capability(&self, capability: Capability) -> Vec<ArtifactRecord> {
        self.artifacts
            .values()
            .filter(|r| r.capabilities.contains(&capability))
            .cloned()
            .collect()
    }

    /// Newest release per family, falling back to the newest prerelease for
    /// families with no release.
    pub fn latest_versions(&self) -> Vec<ArtifactRecord> {
        let mut families: BTreeMap<&str, Vec<&ArtifactRecord>> = BTreeMap::new();
        for record in self.artifacts.values() {
            families.entry(record.name.as_str()).or_default().push(record);
        }

        families
            .into_values()
            .filter_map(|family| {
                version::select_latest(&family, record_version, false)
                    .or_else(|| version::select_latest(&family, record_version, true))
                    .map(|r| (*r).clone())
            })
            .collect()
    }

    pub fn create(&mut self, data: NewArtifact) -> StoreResult<ArtifactRecord> {
        self.ensure_unique(&data.name, &data.version, None)?;

        let id = ArtifactId(self.next_id);
        self.next_id += 1;
        let record = ArtifactRecord::from_new(id, data, Utc::now());
        self.artifacts.insert(id, record.clone());
        Ok(record)
    }

    pub fn update(&mut self, id: ArtifactId, patch: ArtifactPatch) -> StoreResult<ArtifactRecord> {
        let current = self.artifacts.get(&id).ok_or(StoreError::NotFound(id))?;
        let name = patch.name.as_deref().unwrap_or(&current.name).to_string();
        let version = patch.version.as_deref().unwrap_or(&current.version).to_string();
        self.ensure_unique(&name, &version, Some(id))?;

        let record = self.artifacts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        patch.apply(record, Utc::now());
        Ok(record.clone())
    }

    pub fn delete(&mut self, id: ArtifactId) -> StoreResult<ArtifactRecord> {
        self.artifacts.remove(&id).ok_or(StoreError::NotFound(id))
    }

    fn ensure_unique(&self, name: &str, version: &str, except: Option<ArtifactId>) -> StoreResult<()> {
        let taken = self
            .artifacts
            .values()
            .any(|r| r.name == name && r.version == version && Some(r.id) != except);
        if taken {
            return Err(StoreError::Duplicate {
                name: name.to_string(),
                version: version.to_string(),
            });
        }
        Ok(())
    }
}

fn record_version<'a>(record: &'a &ArtifactRecord) -> &'a str {
    &record.version
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::fixtures::new_artifact;

    #[test]
    fn test_ids_are_sequential() {
        let mut catalog = Catalog::default();
        let a = catalog.create(new_artifact("a", "1.0.0")).unwrap();
        let b = catalog.create(new_artifact("b", "1.0.0")).unwrap();
        assert_eq!(a.id, ArtifactId(1));
        assert_eq!(b.id, ArtifactId(2));

        catalog.delete(a.id).unwrap();
        let c = catalog.create(new_artifact("c", "1.0.0")).unwrap();
        assert_eq!(c.id, ArtifactId(3));
    }

    #[test]
    fn test_uniqueness_on_create_and_update() {
        let mut catalog = Catalog::default();
        catalog.create(new_artifact("a", "1.0.0")).unwrap();
        let second = catalog.create(new_artifact("a", "1.1.0")).unwrap();

        assert!(matches!(
            catalog.create(new_artifact("a", "1.0.0")),
            Err(StoreError::Duplicate { .. })
        ));

        let clash = ArtifactPatch {
            version: Some("1.0.0".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            catalog.update(second.id, clash),
            Err(StoreError::Duplicate { .. })
        ));

        // Re-stating its own key is fine.
        let same = ArtifactPatch {
            version: Some("1.1.0".to_string()),
            ..Default::default()
        };
        assert!(catalog.update(second.id, same).is_ok());
    }

    #[test]
    fn test_latest_versions_per_family() {
        let mut catalog = Catalog::default();
        for (name, version) in [
            ("a", "1.0.0"),
            ("a", "1.10.0"),
            ("a", "2.0.0-rc.1"),
            ("b", "0.1.0-beta"),
        ] {
            catalog.create(new_artifact(name, version)).unwrap();
        }

        let latest: Vec<String> = catalog.latest_versions().iter().map(ArtifactRecord::key).collect();
        assert_eq!(latest, ["a@1.10.0", "b@0.1.0-beta"]);
    }

    #[test]
    fn test_missing_ids() {
        let mut catalog = Catalog::default();
        assert!(matches!(catalog.delete(ArtifactId(9)), Err(StoreError::NotFound(ArtifactId(9)))));
        assert!(matches!(
            catalog.update(ArtifactId(9), ArtifactPatch::default()),
            Err(StoreError::NotFound(_))
        ));
    }
}
