//! Attachment row model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slm_core::traits::ObjectHandle;
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle state of an attachment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attachment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttachmentStatus {
    /// Part of the media library.
    Active,
    /// Moved to the trash; still occupies storage.
    Trashed,
}

/// A row of the `attachments` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Attachment {
    /// Attachment identifier.
    pub id: Uuid,
    /// File path, relative to the uploads directory or absolute.
    pub file_path: Option<String>,
    /// MIME type.
    pub mime_type: Option<String>,
    /// Lifecycle state.
    pub status: AttachmentStatus,
    /// Insert time.
    pub created_at: DateTime<Utc>,
}

impl From<&Attachment> for ObjectHandle {
    fn from(attachment: &Attachment) -> Self {
        ObjectHandle::new(attachment.id.to_string(), attachment.mime_type.clone())
    }
}
