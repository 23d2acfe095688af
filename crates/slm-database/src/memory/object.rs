//! In-memory object store with virtual files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use slm_core::error::AppError;
use slm_core::result::AppResult;
use slm_core::traits::{ObjectHandle, ObjectStore};

#[derive(Debug, Default)]
struct Inner {
    objects: Vec<(ObjectHandle, Option<PathBuf>)>,
    files: HashMap<PathBuf, u64>,
}

/// [`ObjectStore`] whose objects and file sizes live in memory.
///
/// Objects are listed in insertion order. A file can be removed
/// independently of its object to model out-of-band deletion.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    inner: RwLock<Inner>,
    unavailable: AtomicBool,
}

impl MemoryObjectStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object. `size = None` records the path without a file.
    pub async fn insert(
        &self,
        id: &str,
        mime_type: Option<&str>,
        path: Option<&str>,
        size: Option<u64>,
    ) -> ObjectHandle {
        let handle = ObjectHandle::new(id, mime_type.map(str::to_string));
        let path = path.map(PathBuf::from);
        let mut inner = self.inner.write().await;
        if let (Some(path), Some(size)) = (&path, size) {
            inner.files.insert(path.clone(), size);
        }
        inner.objects.push((handle.clone(), path));
        handle
    }

    /// Remove an object and its file. Returns the removed handle.
    pub async fn remove(&self, id: &str) -> Option<ObjectHandle> {
        let mut inner = self.inner.write().await;
        let index = inner.objects.iter().position(|(h, _)| h.id == id)?;
        let (handle, path) = inner.objects.remove(index);
        if let Some(path) = path {
            inner.files.remove(&path);
        }
        Some(handle)
    }

    /// Delete a file but keep its object.
    pub async fn remove_file(&self, path: &str) -> bool {
        self.inner
            .write()
            .await
            .files
            .remove(Path::new(path))
            .is_some()
    }

    /// Make listing and stat calls fail with a storage error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::storage("Object store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_objects(&self, limit: u64, offset: u64) -> AppResult<Vec<ObjectHandle>> {
        self.check()?;
        let inner = self.inner.read().await;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(inner
            .objects
            .iter()
            .skip(offset)
            .take(limit)
            .map(|(handle, _)| handle.clone())
            .collect())
    }

    async fn resolve_file(&self, object: &ObjectHandle) -> AppResult<Option<PathBuf>> {
        self.check()?;
        let inner = self.inner.read().await;
        Ok(inner
            .objects
            .iter()
            .find(|(handle, _)| handle.id == object.id)
            .and_then(|(_, path)| path.clone()))
    }

    async fn file_size(&self, path: &Path) -> AppResult<Option<u64>> {
        self.check()?;
        Ok(self.inner.read().await.files.get(path).copied())
    }

    async fn type_counts(&self) -> AppResult<Vec<(String, u64)>> {
        self.check()?;
        let inner = self.inner.read().await;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for (handle, _) in &inner.objects {
            let mime = handle
                .mime_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string());
            *counts.entry(mime).or_default() += 1;
        }
        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort();
        Ok(counts)
    }
}
