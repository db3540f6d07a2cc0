//! In-process artifact store.

use futures::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;

use super::catalog::Catalog;
use super::error::StoreResult;
use super::filter::ArtifactFilter;
use super::record::{ArtifactId, ArtifactPatch, ArtifactRecord, Capability, NewArtifact};
use super::traits::ArtifactStore;

/// Store that keeps records in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: RwLock<Catalog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.catalog.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for MemoryStore {
    fn find_by_name_and_version<'a>(
        &'a self,
        name: &'a str,
        version: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<ArtifactRecord>>> {
        let found = self.catalog.read().by_name_and_version(name, version);
        async move { Ok(found) }.boxed()
    }

    fn find_by_id(&self, id: ArtifactId) -> BoxFuture<'_, StoreResult<Option<ArtifactRecord>>> {
        let found = self.catalog.read().by_id(id);
        async move { Ok(found) }.boxed()
    }

    fn find_all<'a>(
        &'a self,
        filter: &'a ArtifactFilter,
    ) -> BoxFuture<'a, StoreResult<Vec<ArtifactRecord>>> {
        let found = self.catalog.read().find_all(filter);
        async move { Ok(found) }.boxed()
    }

    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, StoreResult<Vec<ArtifactRecord>>> {
        let found = self.catalog.read().search(query);
        async move { Ok(found) }.boxed()
    }

    fn find_by_capability(
        &self,
        capability: Capability,
    ) -> BoxFuture<'_, StoreResult<Vec<ArtifactRecord>>> {
        let found = self.catalog.read().by_capability(capability);
        async move { Ok(found) }.boxed()
    }

    fn find_latest_versions(&self) -> BoxFuture<'_, StoreResult<Vec<ArtifactRecord>>> {
        let found = self.catalog.read().latest_versions();
        async move { Ok(found) }.boxed()
    }

    fn create(&self, data: NewArtifact) -> BoxFuture<'_, StoreResult<ArtifactRecord>> {
        let result = self.catalog.write().create(data);
        async move { result }.boxed()
    }

    fn update(
        &self,
        id: ArtifactId,
        patch: ArtifactPatch,
    ) -> BoxFuture<'_, StoreResult<ArtifactRecord>> {
        let result = self.catalog.write().update(id, patch);
        async move { result }.boxed()
    }

    fn delete(&self, id: ArtifactId) -> BoxFuture<'_, StoreResult<ArtifactRecord>> {
        let result = self.catalog.write().delete(id);
        async move { result }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::fixtures::new_artifact;
    use crate::store::StoreError;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryStore::new();
        let record = store.create(new_artifact("ad-detector", "1.0.0")).await.unwrap();

        let by_key = store
            .find_by_name_and_version("ad-detector", "1.0.0")
            .await
            .unwrap();
        assert_eq!(by_key.as_ref(), Some(&record));
        assert_eq!(store.find_by_id(record.id).await.unwrap(), Some(record));
        assert!(store.find_by_id(ArtifactId(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create() {
        let store = MemoryStore::new();
        store.create(new_artifact("ad-detector", "1.0.0")).await.unwrap();
        let err = store.create(new_artifact("ad-detector", "1.0.0")).await.unwrap_err();

        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let store: Arc<dyn ArtifactStore> = Arc::new(MemoryStore::new());
        let record = store.create(new_artifact("ocr", "0.1.0")).await.unwrap();
        let deleted = store.delete(record.id).await.unwrap();

        assert_eq!(deleted.id, record.id);
        assert!(store.find_all(&ArtifactFilter::new()).await.unwrap().is_empty());
    }
}
