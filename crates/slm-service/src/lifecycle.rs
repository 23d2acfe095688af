//! Turns object lifecycle notifications into usage updates.

use std::sync::Arc;

use tracing::{debug, info};

use slm_core::events::UsageEvent;
use slm_core::result::AppResult;
use slm_core::traits::{EventSink, ObjectHandle, ObjectStore};

use crate::recalc::RecalculationScheduler;
use crate::usage::UsageStore;

/// Keeps the running total in step with uploads and deletions.
///
/// Each notification applies an incremental delta; creations also request a
/// debounced rescan so that sizes changed after upload (thumbnails,
/// processing) are picked up.
#[derive(Debug, Clone)]
pub struct LifecycleTracker {
    objects: Arc<dyn ObjectStore>,
    store: Arc<UsageStore>,
    scheduler: Arc<RecalculationScheduler>,
    events: Arc<dyn EventSink>,
}

impl LifecycleTracker {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        store: Arc<UsageStore>,
        scheduler: Arc<RecalculationScheduler>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            objects,
            store,
            scheduler,
            events,
        }
    }

    /// A new object was stored. Returns its counted size.
    pub async fn on_object_created(&self, handle: &ObjectHandle) -> AppResult<u64> {
        let size = self.file_size(handle).await?;
        if let Some(size) = size {
            let total_bytes = self.store.apply_delta(to_delta(size)).await?;
            info!(object_id = %handle.id, size_bytes = size, total_bytes, "Object counted");
            self.events.publish(
                UsageEvent::FileUploaded {
                    object_id: handle.id.clone(),
                    size_bytes: size,
                    total_bytes,
                }
                .into(),
            );
        }
        self.scheduler.schedule().await?;
        Ok(size.unwrap_or(0))
    }

    /// An object is about to be deleted; its file must still exist.
    /// Returns the subtracted size.
    pub async fn on_object_deleted(&self, handle: &ObjectHandle) -> AppResult<u64> {
        let Some(size) = self.file_size(handle).await? else {
            debug!(object_id = %handle.id, "Deleted object had no file");
            return Ok(0);
        };
        let total_bytes = self.store.apply_delta(-to_delta(size)).await?;
        info!(object_id = %handle.id, size_bytes = size, total_bytes, "Object uncounted");
        self.events.publish(
            UsageEvent::FileDeleted {
                object_id: handle.id.clone(),
                size_bytes: size,
                total_bytes,
            }
            .into(),
        );
        Ok(size)
    }

    /// Metadata was regenerated. Returns whether a rescan was requested.
    pub async fn on_metadata_updated(
        &self,
        handle: &ObjectHandle,
        has_metadata: bool,
    ) -> AppResult<bool> {
        if !has_metadata {
            return Ok(false);
        }
        debug!(object_id = %handle.id, "Metadata updated");
        self.scheduler.schedule().await?;
        Ok(true)
    }

    async fn file_size(&self, handle: &ObjectHandle) -> AppResult<Option<u64>> {
        match self.objects.resolve_file(handle).await? {
            Some(path) => self.objects.file_size(&path).await,
            None => Ok(None),
        }
    }
}

fn to_delta(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use crate::testing::Harness;
    use slm_core::traits::ObjectHandle;

    #[tokio::test]
    async fn test_upload_then_delete() {
        let h = Harness::new().await;
        let mut rx = h.bus.subscribe();
        let handle = h.objects.insert("1", Some("image/png"), Some("/1.png"), Some(4096)).await;

        let tracker = &h.services.lifecycle;
        assert_eq!(tracker.on_object_created(&handle).await.unwrap(), 4096);
        assert_eq!(h.services.usage_store.get_current_usage().await.unwrap(), 4096);
        assert!(h.services.scheduler.is_pending().await.unwrap());

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.name());
        }
        assert_eq!(names, vec!["usage_updated", "file_uploaded"]);

        assert_eq!(tracker.on_object_deleted(&handle).await.unwrap(), 4096);
        assert_eq!(h.services.usage_store.get_current_usage().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_counts_nothing() {
        let h = Harness::new().await;
        h.services.usage_store.overwrite(100).await.unwrap();
        let handle = h.objects.insert("1", None, Some("/gone"), None).await;

        let tracker = &h.services.lifecycle;
        assert_eq!(tracker.on_object_created(&handle).await.unwrap(), 0);
        assert_eq!(tracker.on_object_deleted(&handle).await.unwrap(), 0);

        let unknown = ObjectHandle::new("nope", None);
        assert_eq!(tracker.on_object_deleted(&unknown).await.unwrap(), 0);
        assert_eq!(h.services.usage_store.get_current_usage().await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_metadata_update_schedules_only_with_metadata() {
        let h = Harness::new().await;
        let handle = ObjectHandle::new("1", None);
        let tracker = &h.services.lifecycle;

        assert!(!tracker.on_metadata_updated(&handle, false).await.unwrap());
        assert!(h.executor.calls().await.is_empty());

        assert!(tracker.on_metadata_updated(&handle, true).await.unwrap());
        assert_eq!(h.executor.calls().await.len(), 1);
    }
}
