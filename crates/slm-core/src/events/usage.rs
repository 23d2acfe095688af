//! Usage accounting events.

use serde::{Deserialize, Serialize};

/// Events describing changes to the tracked storage usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UsageEvent {
    /// The usage record was written.
    UsageUpdated {
        /// New total in bytes.
        total_bytes: u64,
        /// Signed change that produced it (the full total for overwrites).
        delta: i64,
    },
    /// A full rescan committed a new authoritative total.
    UsageRecalculated {
        /// Sum of all existing files.
        total_bytes: u64,
        /// Objects whose files were found and counted.
        processed: u64,
        /// Objects whose backing file was missing.
        missing: u64,
    },
    /// An upload was refused by the quota guard.
    UploadBlocked {
        /// Size of the refused upload.
        file_size: u64,
        /// Usage at decision time.
        total_bytes: u64,
        /// Configured quota.
        max_bytes: u64,
    },
    /// A stored object was created and counted incrementally.
    FileUploaded {
        /// Object identifier.
        object_id: String,
        /// Size added.
        size_bytes: u64,
        /// Usage after the update.
        total_bytes: u64,
    },
    /// A stored object was deleted and subtracted incrementally.
    FileDeleted {
        /// Object identifier.
        object_id: String,
        /// Size removed.
        size_bytes: u64,
        /// Usage after the update.
        total_bytes: u64,
    },
    /// The usage record was discarded.
    UsageCleared,
}

impl UsageEvent {
    /// Short event name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UsageUpdated { .. } => "usage_updated",
            Self::UsageRecalculated { .. } => "usage_recalculated",
            Self::UploadBlocked { .. } => "upload_blocked",
            Self::FileUploaded { .. } => "file_uploaded",
            Self::FileDeleted { .. } => "file_deleted",
            Self::UsageCleared => "usage_cleared",
        }
    }
}
