//! Core types for Reupcast

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::interval_from_minutes;
use crate::error::{ReupcastError, Result};
use crate::publish::FanOutPolicy;

/// A staged video waiting to be published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoItem {
    /// 1-based position of the video in its batch
    pub sequence_index: usize,
    pub source_path: PathBuf,
    pub title: String,
}

impl VideoItem {
    pub fn new(sequence_index: usize, source_path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            sequence_index,
            source_path: source_path.into(),
            title: title.into(),
        }
    }
}

/// One destination account, identified by its access token
pub struct Destination {
    credential: SecretString,
}

impl Destination {
    /// Create a destination from an access token
    ///
    /// # Errors
    ///
    /// Returns `ReupcastError::InvalidInput` if the token is empty or blank.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            return Err(ReupcastError::InvalidInput(
                "Destination token cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            credential: SecretString::from(token.to_string()),
        })
    }

    pub fn credential(&self) -> &SecretString {
        &self.credential
    }

    /// Masked form of the token that is safe to log and report
    pub fn hint(&self) -> String {
        mask_token(self.credential.expose_secret())
    }
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Destination")
            .field("credential", &self.hint())
            .finish()
    }
}

/// Keep the first and last four characters of a token
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Result of one publish attempt against one destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    /// 1-based position of the destination in the destination list
    pub destination: usize,
    /// Masked credential of the destination
    pub credential: String,
    pub success: bool,
    /// Success note or error text
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Success,
    Failed,
}

impl VideoStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, VideoStatus::Success)
    }
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoStatus::Success => write!(f, "success"),
            VideoStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Aggregated result for one video, emitted once its attempts have resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoResult {
    pub video_index: usize,
    pub status: VideoStatus,
    pub policy: FanOutPolicy,
    /// Summary for broadcast; the last attempted destination's message for first-success
    pub detail: String,
    /// Every attempt made for this video, in destination order
    pub results: Vec<AttemptOutcome>,
}

impl VideoResult {
    /// The last attempt made, which is the chosen outcome under first-success
    pub fn final_outcome(&self) -> Option<&AttemptOutcome> {
        self.results.last()
    }
}

/// A validated-on-run batch of videos and destinations
#[derive(Debug)]
pub struct BatchRequest {
    pub videos: Vec<VideoItem>,
    pub destinations: Vec<Destination>,
    pub pacing_interval: Duration,
}

impl BatchRequest {
    pub fn new(videos: Vec<VideoItem>, destinations: Vec<Destination>, pacing_interval: Duration) -> Self {
        Self {
            videos,
            destinations,
            pacing_interval,
        }
    }

    /// Build a batch from the parallel arrays supplied by the intake side
    ///
    /// Titles are matched to files by position; the pacing interval is given in
    /// whole minutes.
    ///
    /// # Errors
    ///
    /// Returns `ReupcastError::InvalidInput` if there are no files, no tokens,
    /// a blank token, or the title count differs from the file count.
    pub fn from_intake(
        files: Vec<PathBuf>,
        titles: Vec<String>,
        tokens: Vec<String>,
        interval_minutes: u64,
    ) -> Result<Self> {
        validate_counts(files.len(), titles.len(), tokens.len())?;

        let destinations = tokens
            .into_iter()
            .map(Destination::new)
            .collect::<Result<Vec<_>>>()?;

        let videos = files
            .into_iter()
            .zip(titles)
            .enumerate()
            .map(|(i, (path, title))| VideoItem::new(i + 1, path, title))
            .collect();

        Ok(Self::new(
            videos,
            destinations,
            interval_from_minutes(interval_minutes),
        ))
    }

    /// Check the batch before any remote call is made
    pub fn validate(&self) -> Result<()> {
        validate_counts(self.videos.len(), self.videos.len(), self.destinations.len())?;

        let ordered = self
            .videos
            .windows(2)
            .all(|pair| pair[0].sequence_index < pair[1].sequence_index);
        if !ordered || self.videos[0].sequence_index == 0 {
            return Err(ReupcastError::InvalidInput(
                "Video sequence indexes must start at 1 and increase".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_counts(videos: usize, titles: usize, destinations: usize) -> Result<()> {
    if videos == 0 {
        return Err(ReupcastError::InvalidInput(
            "No video files provided".to_string(),
        ));
    }
    if destinations == 0 {
        return Err(ReupcastError::InvalidInput(
            "No destination tokens provided".to_string(),
        ));
    }
    if videos != titles {
        return Err(ReupcastError::InvalidInput(format!(
            "Number of titles ({}) does not match the number of videos ({})",
            titles, videos
        )));
    }
    Ok(())
}
