//! Artifact store backed by a JSON document on disk.

use std::path::{Path, PathBuf};

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::Mutex;
use tracing::debug;

use super::catalog::Catalog;
use super::error::{StoreError, StoreResult};
use super::filter::ArtifactFilter;
use super::record::{ArtifactId, ArtifactPatch, ArtifactRecord, Capability, NewArtifact};
use super::traits::ArtifactStore;

/// Store persisted to a single JSON file.
///
/// The whole catalog is rewritten after each mutation through a temporary
/// file and a rename, so readers never observe a half-written document. A
/// mutation whose write fails leaves the in-memory catalog unchanged.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    catalog: Mutex<Catalog>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let catalog = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Catalog::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        debug!(path = %path.display(), "Opened artifact store");

        Ok(Self {
            path,
            catalog: Mutex::new(catalog),
        })
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn mutate<T>(&self, op: impl FnOnce(&mut Catalog) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.catalog.lock().await;
        let mut next = guard.clone();
        let value = op(&mut next)?;
        self.flush(&next).await?;
        *guard = next;
        Ok(value)
    }

    async fn flush(&self, catalog: &Catalog) -> StoreResult<()> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let body = serde_json::to_vec_pretty(catalog)?;
        let temp = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp, body).await.map_err(io_err)?;
        tokio::fs::rename(&temp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

impl ArtifactStore for JsonFileStore {
    fn find_by_name_and_version<'a>(
        &'a self,
        name: &'a str,
        version: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<ArtifactRecord>>> {
        async move { Ok(self.catalog.lock().await.by_name_and_version(name, version)) }.boxed()
    }

    fn find_by_id(&self, id: ArtifactId) -> BoxFuture<'_, StoreResult<Option<ArtifactRecord>>> {
        async move { Ok(self.catalog.lock().await.by_id(id)) }.boxed()
    }

    fn find_all<'a>(
        &'a self,
        filter: &'a ArtifactFilter,
    ) -> BoxFuture<'a, StoreResult<Vec<ArtifactRecord>>> {
        async move { Ok(self.catalog.lock().await.find_all(filter)) }.boxed()
    }

    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, StoreResult<Vec<ArtifactRecord>>> {
        async move { Ok(self.catalog.lock().await.search(query)) }.boxed()
    }

    fn find_by_capability(
        &self,
        capability: Capability,
    ) -> BoxFuture<'_, StoreResult<Vec<ArtifactRecord>>> {
        async move { Ok(self.catalog.lock().await.by_capability(capability)) }.boxed()
    }

    fn find_latest_versions(&self) -> BoxFuture<'_, StoreResult<Vec<ArtifactRecord>>> {
        async move { Ok(self.catalog.lock().await.latest_versions()) }.boxed()
    }

    fn create(&self, data: NewArtifact) -> BoxFuture<'_, StoreResult<ArtifactRecord>> {
        async move { self.mutate(|catalog| catalog.create(data)).await }.boxed()
    }

    fn update(
        &self,
        id: ArtifactId,
        patch: ArtifactPatch,
    ) -> BoxFuture<'_, StoreResult<ArtifactRecord>> {
        async move { self.mutate(|catalog| catalog.update(id, patch)).await }.boxed()
    }

    fn delete(&self, id: ArtifactId) -> BoxFuture<'_, StoreResult<ArtifactRecord>> {
        async move { self.mutate(|catalog| catalog.delete(id)).await }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::fixtures::new_artifact;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp.path().join("store.json")).await.unwrap();

        assert!(store.find_all(&ArtifactFilter::new()).await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("store.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        let a = store.create(new_artifact("ad-detector", "1.0.0")).await.unwrap();
        let b = store.create(new_artifact("ad-detector", "1.1.0")).await.unwrap();
        store.delete(a.id).await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let all = reopened.find_all(&ArtifactFilter::new()).await.unwrap();
        assert_eq!(all, vec![b]);

        // The id sequence continues after reopening.
        let c = reopened.create(new_artifact("ocr", "0.1.0")).await.unwrap();
        assert_eq!(c.id, ArtifactId(3));
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_no_trace() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp.path().join("store.json")).await.unwrap();
        store.create(new_artifact("ad-detector", "1.0.0")).await.unwrap();

        let err = store.create(new_artifact("ad-detector", "1.0.0")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(store.find_all(&ArtifactFilter::new()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
