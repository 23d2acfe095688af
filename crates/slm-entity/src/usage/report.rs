//! Results of a full rescan and of the file-type breakdown.

use serde::{Deserialize, Serialize};

/// Outcome of one authoritative recalculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecalculationReport {
    /// Committed total in bytes.
    pub total_bytes: u64,
    /// Objects whose file existed and was counted.
    pub processed_count: u64,
    /// Objects with no path or no file on disk.
    pub missing_count: u64,
}

/// Number of stored objects, overall and per top-level MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileStatistics {
    /// Total number of objects.
    pub total_files: u64,
    /// Counts keyed by top-level type (`image`, `video`, ...), sorted by key.
    pub by_type: Vec<(String, u64)>,
}
