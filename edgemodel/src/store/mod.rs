//! Persistence of artifact metadata records.
//!
//! The lifecycle orchestrator owns every record and reaches storage only
//! through the [`ArtifactStore`] trait. Two implementations are provided:
//!
//! - [`MemoryStore`]: process-local, for tests and embedding
//! - [`JsonFileStore`]: a JSON document rewritten atomically on each change

mod catalog;
mod error;
mod filter;
mod json;
mod memory;
mod record;
mod traits;

pub use crate::inspect::Framework;
pub use error::{StoreError, StoreResult};
pub use filter::{matches_text, ArtifactFilter, SortDirection, SortKey};
pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use record::{ArtifactId, ArtifactPatch, ArtifactRecord, Capability, ModelType, NewArtifact};
pub use traits::ArtifactStore;

#[cfg(test)]
pub(crate) use record::fixtures;
