//! Enumeration of stored media objects.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// A stored media object as seen by the accounting service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectHandle {
    /// Stable object identifier.
    pub id: String,
    /// MIME type, if recorded.
    pub mime_type: Option<String>,
}

impl ObjectHandle {
    /// Create a handle.
    pub fn new(id: impl Into<String>, mime_type: Option<String>) -> Self {
        Self {
            id: id.into(),
            mime_type,
        }
    }
}

/// Access to the media library the quota applies to.
///
/// Listing must be stable for a given `(limit, offset)` while no objects
/// are created or removed.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug + 'static {
    /// List up to `limit` objects starting at `offset`.
    async fn list_objects(&self, limit: u64, offset: u64) -> AppResult<Vec<ObjectHandle>>;

    /// Resolve an object's backing file. `None` if no file is recorded.
    async fn resolve_file(&self, object: &ObjectHandle) -> AppResult<Option<PathBuf>>;

    /// Size of a file in bytes, or `None` if it does not exist.
    async fn file_size(&self, path: &Path) -> AppResult<Option<u64>>;

    /// Number of objects per MIME type.
    async fn type_counts(&self) -> AppResult<Vec<(String, u64)>>;
}
