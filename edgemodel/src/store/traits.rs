//! The persistence interface consumed by the lifecycle orchestrator.

use futures::future::BoxFuture;

use super::error::StoreResult;
use super::filter::ArtifactFilter;
use super::record::{ArtifactId, ArtifactPatch, ArtifactRecord, Capability, NewArtifact};

/// Storage for artifact metadata records.
///
/// Implementations enforce `(name, version)` uniqueness on `create` and
/// `update`. Each mutating call is a single logical transaction.
///
/// # Dyn Compatibility
///
/// Async methods return boxed futures so the orchestrator can hold an
/// `Arc<dyn ArtifactStore>`.
pub trait ArtifactStore: Send + Sync {
    fn find_by_name_and_version<'a>(
        &'a self,
        name: &'a str,
        version: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<ArtifactRecord>>>;

    fn find_by_id(&self, id: ArtifactId) -> BoxFuture<'_, StoreResult<Option<ArtifactRecord>>>;

    /// Records matching `filter`, sorted and paginated.
    fn find_all<'a>(
        &'a self,
        filter: &'a ArtifactFilter,
    ) -> BoxFuture<'a, StoreResult<Vec<ArtifactRecord>>>;

    /// Free-text search over name, description and tags.
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, StoreResult<Vec<ArtifactRecord>>>;

    fn find_by_capability(
        &self,
        capability: Capability,
    ) -> BoxFuture<'_, StoreResult<Vec<ArtifactRecord>>>;

    /// The newest release of every family, by name.
    fn find_latest_versions(&self) -> BoxFuture<'_, StoreResult<Vec<ArtifactRecord>>>;

    /// Insert a record.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`](super::StoreError::Duplicate) when the
    /// `(name, version)` pair is taken.
    fn create(&self, data: NewArtifact) -> BoxFuture<'_, StoreResult<ArtifactRecord>>;

    fn update(
        &self,
        id: ArtifactId,
        patch: ArtifactPatch,
    ) -> BoxFuture<'_, StoreResult<ArtifactRecord>>;

    /// Remove a record and return it.
    fn delete(&self, id: ArtifactId) -> BoxFuture<'_, StoreResult<ArtifactRecord>>;
}
