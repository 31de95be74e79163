//! Remote video platform abstraction
//!
//! Publishing code only talks to [`VideoPlatform`]; the Graph API client and
//! the mock used by tests both implement it.

use async_trait::async_trait;
use secrecy::SecretString;
use std::path::Path;

use crate::error::Result;

pub mod graph;

// Mock platform is available for all builds (not just tests) to support integration tests
pub mod mock;

/// A staged video opened for a single upload
///
/// The file handle is consumed by the upload, so every attempt needs a fresh
/// `VideoUpload`.
#[derive(Debug)]
pub struct VideoUpload {
    pub file: tokio::fs::File,
    pub file_name: String,
    pub length: u64,
    /// Sent to the platform as the video description
    pub title: String,
}

impl VideoUpload {
    /// Open a staged file for reading
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be opened or inspected.
    pub async fn open(path: &Path, title: &str) -> Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());

        Ok(Self {
            file,
            file_name,
            length,
            title: title.to_string(),
        })
    }
}

/// Platform trait for publishing videos to one destination account
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Lowercase identifier used in logs (e.g. "graph", "mock")
    fn name(&self) -> &str;

    /// Publish one video with one destination credential
    ///
    /// Makes exactly one request. Returns the platform's id for the created
    /// video.
    ///
    /// # Errors
    ///
    /// Returns a `PlatformError` when the platform rejects the upload or the
    /// request cannot be completed.
    async fn publish_video(&self, upload: VideoUpload, credential: &SecretString) -> Result<String>;
}
