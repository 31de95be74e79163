//! Staging area for incoming videos
//!
//! Publishing deletes every file it is handed, so user-supplied videos are
//! first copied here under generated names.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{ReupcastError, Result};
use crate::publish::cleanup::remove_staged;

pub struct StagingArea {
    dir: PathBuf,
    seq: AtomicU64,
    shutdown: Option<watch::Receiver<bool>>,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: AtomicU64::new(0),
            shutdown: None,
        }
    }

    /// Abandon `stage_all` once `true` is sent on the channel
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_name(&self) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("video_{}_{}.mp4", millis, seq)
    }

    /// Copy `source` into the staging directory and return the staged path
    pub async fn stage(&self, source: &Path) -> Result<PathBuf> {
        let metadata = tokio::fs::metadata(source).await.map_err(|e| {
            ReupcastError::InvalidInput(format!(
                "Cannot read video file {}: {}",
                source.display(),
                e
            ))
        })?;
        if !metadata.is_file() {
            return Err(ReupcastError::InvalidInput(format!(
                "Not a regular file: {}",
                source.display()
            )));
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let staged = self.dir.join(self.next_name());
        tokio::fs::copy(source, &staged).await.map_err(|e| {
            ReupcastError::InvalidInput(format!(
                "Failed to stage {}: {}",
                source.display(),
                e
            ))
        })?;

        debug!("Staged {} as {}", source.display(), staged.display());
        Ok(staged)
    }

    /// Stage every source in order, or none of them
    ///
    /// On the first failure, or on shutdown, files already staged by this
    /// call are removed and the error is returned. Shutdown is checked
    /// between copies and yields [`ReupcastError::Cancelled`].
    pub async fn stage_all(&self, sources: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut staged = Vec::with_capacity(sources.len());

        for source in sources {
            let outcome = if self.is_cancelled() {
                Err(ReupcastError::Cancelled)
            } else {
                self.stage(source).await
            };

            match outcome {
                Ok(path) => staged.push(path),
                Err(e) => {
                    roll_back(&staged, &e).await;
                    return Err(e);
                }
            }
        }

        if self.is_cancelled() {
            let e = ReupcastError::Cancelled;
            roll_back(&staged, &e).await;
            return Err(e);
        }

        Ok(staged)
    }
}

async fn roll_back(staged: &[PathBuf], cause: &ReupcastError) {
    warn!("Staging stopped ({}), rolling back {} file(s)", cause, staged.len());
    for path in staged {
        remove_staged(path).await;
    }
}
