//! Atomic replacement of client model files.
//!
//! Content goes to a temporary file in the target's directory, then is renamed over
//! the target (atomic on POSIX). A failed write leaves the original file untouched.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{io_err, SyncError};

pub(crate) fn atomic_write(path: &Path, content: &str) -> Result<(), SyncError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| io_err(dir, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| io_err(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| io_err(tmp.path(), e))?;

    // Keep the original file's permissions; NamedTempFile creates 0600 files.
    if let Ok(meta) = std::fs::metadata(path) {
        std::fs::set_permissions(tmp.path(), meta.permissions())
            .map_err(|e| io_err(tmp.path(), e))?;
    }

    tmp.persist(path).map_err(|e| io_err(path, e.error))?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "Atomically replaced file");
    Ok(())
}
