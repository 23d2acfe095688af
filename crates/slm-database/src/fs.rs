//! File metadata helpers shared by the object stores.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use slm_core::error::{AppError, ErrorKind};
use slm_core::result::AppResult;

/// Size of a regular file, `None` if nothing exists at `path`.
///
/// Directories count as missing. Any other I/O failure is a storage error.
pub async fn regular_file_size(path: &Path) -> AppResult<Option<u64>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to stat {}", path.display()),
            e,
        )),
    }
}

/// Resolve a stored path against the uploads directory.
///
/// Empty paths resolve to nothing; absolute paths are kept as they are.
pub fn resolve_upload_path(uploads_dir: &Path, stored: &str) -> Option<PathBuf> {
    let trimmed = stored.trim();
    if trimmed.is_empty() {
        return None;
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        Some(path.to_path_buf())
    } else {
        Some(uploads_dir.join(path))
    }
}
