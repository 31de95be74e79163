//! Deletion of staged video files

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Ownership of one staged file until it is deleted
///
/// [`StagedFile::remove`] is the normal path. If the guard is dropped without
/// it (a cancelled future, a panic), the file is removed synchronously on drop.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    removed: bool,
}

impl StagedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            removed: false,
        }
    }

    /// Delete the file; returns `true` if a file was actually removed
    pub async fn remove(mut self) -> bool {
        self.removed = true;
        remove_staged(&self.path).await
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed staged file {} on drop", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to delete staged file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Delete a staged file, treating an already-missing file as done
///
/// Errors are logged, never returned: cleanup must not stop a batch.
pub async fn remove_staged(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Deleted staged file {}", path.display());
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Staged file {} already removed", path.display());
            false
        }
        Err(e) => {
            warn!("Failed to delete staged file {}: {}", path.display(), e);
            false
        }
    }
}
