//! Attachments table as the accounting object store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use slm_core::error::{AppError, ErrorKind};
use slm_core::result::AppResult;
use slm_core::traits::{ObjectHandle, ObjectStore};
use slm_entity::attachment::Attachment;

use crate::fs::{regular_file_size, resolve_upload_path};

/// [`ObjectStore`] over the `attachments` table, with files stored below
/// an uploads directory.
#[derive(Debug, Clone)]
pub struct AttachmentRepository {
    pool: PgPool,
    uploads_dir: PathBuf,
}

impl AttachmentRepository {
    /// Create a repository resolving relative paths against `uploads_dir`.
    pub fn new(pool: PgPool, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            uploads_dir: uploads_dir.into(),
        }
    }

    /// Find an attachment by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Attachment>> {
        sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Persistence, "Failed to find attachment", e)
            })
    }

    /// Total number of attachments.
    pub async fn count(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attachments")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Persistence, "Failed to count attachments", e)
            })?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl ObjectStore for AttachmentRepository {
    async fn list_objects(&self, limit: u64, offset: u64) -> AppResult<Vec<ObjectHandle>> {
        let rows = sqlx::query_as::<_, Attachment>(
            "SELECT * FROM attachments ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Persistence, "Failed to list attachments", e)
        })?;

        Ok(rows.iter().map(ObjectHandle::from).collect())
    }

    async fn resolve_file(&self, object: &ObjectHandle) -> AppResult<Option<PathBuf>> {
        let Ok(id) = Uuid::parse_str(&object.id) else {
            return Ok(None);
        };
        let stored: Option<Option<String>> =
            sqlx::query_scalar("SELECT file_path FROM attachments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Persistence,
                        "Failed to read attachment path",
                        e,
                    )
                })?;

        Ok(stored
            .flatten()
            .and_then(|path| resolve_upload_path(&self.uploads_dir, &path)))
    }

    async fn file_size(&self, path: &Path) -> AppResult<Option<u64>> {
        regular_file_size(path).await
    }

    async fn type_counts(&self) -> AppResult<Vec<(String, u64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT COALESCE(mime_type, 'application/octet-stream') AS mime, COUNT(*) \
             FROM attachments GROUP BY mime ORDER BY mime",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Persistence, "Failed to count attachment types", e)
        })?;

        Ok(rows
            .into_iter()
            .map(|(mime, count)| (mime, count.max(0) as u64))
            .collect())
    }
}
