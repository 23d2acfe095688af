//! Settings export document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::settings::SettingsPatch;

/// Portable copy of the quota settings.
///
/// `settings` is a patch so that hand-edited or older documents with
/// missing fields can still be imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsExport {
    /// Version of the software that produced the export.
    pub version: String,
    /// Export time.
    pub exported_at: DateTime<Utc>,
    /// The exported settings.
    pub settings: SettingsPatch,
}

/// Whether dotted version `candidate` is newer than `current`.
///
/// Non-numeric components compare as zero.
pub fn is_newer_version(candidate: &str, current: &str) -> bool {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| part.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let (mut a, mut b) = (parse(candidate), parse(current));
    let len = a.len().max(b.len());
    a.resize(len, 0);
    b.resize(len, 0);
    a > b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_comparison() {
        assert!(is_newer_version("0.2.0", "0.1.9"));
        assert!(is_newer_version("1.0", "0.9.9"));
        assert!(!is_newer_version("0.1.0", "0.1.0"));
        assert!(!is_newer_version("0.1", "0.1.0"));
        assert!(!is_newer_version("0.0.9", "0.1.0"));
    }

    #[test]
    fn test_partial_document_deserializes() {
        let json = r#"{"version":"0.1.0","exported_at":"2026-01-01T00:00:00Z","settings":{"max_storage_mb":500}}"#;
        let export: SettingsExport = serde_json::from_str(json).unwrap();
        assert_eq!(export.settings.max_storage_mb, Some(500));
        assert_eq!(export.settings.block_uploads, None);
    }
}
