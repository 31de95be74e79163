//! Per-video fan-out across the destination list

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info};

use super::attempt::attempt;
use super::policy::FanOutPolicy;
use crate::platforms::VideoPlatform;
use crate::types::{AttemptOutcome, Destination, VideoItem, VideoResult, VideoStatus};

/// Publishes one video to a destination list under a fan-out policy
#[derive(Clone)]
pub struct VideoPublisher {
    platform: Arc<dyn VideoPlatform>,
    policy: FanOutPolicy,
}

impl VideoPublisher {
    pub fn new(platform: Arc<dyn VideoPlatform>, policy: FanOutPolicy) -> Self {
        Self { platform, policy }
    }

    pub fn policy(&self) -> FanOutPolicy {
        self.policy
    }

    /// Publish `video` and return its aggregated result
    ///
    /// Resolves only once every attempt the policy calls for has finished.
    pub async fn publish(&self, video: &VideoItem, destinations: &[Destination]) -> VideoResult {
        match self.policy {
            FanOutPolicy::Broadcast => self.broadcast(video, destinations).await,
            FanOutPolicy::FirstSuccess => self.first_success(video, destinations).await,
        }
    }

    async fn broadcast(&self, video: &VideoItem, destinations: &[Destination]) -> VideoResult {
        let platform = self.platform.as_ref();
        let futures: Vec<_> = destinations
            .iter()
            .enumerate()
            .map(|(i, destination)| attempt(platform, video, i + 1, destination))
            .collect();

        // join_all keeps input order, so outcomes line up with destinations
        let results: Vec<AttemptOutcome> = join_all(futures).await;

        let succeeded = results.iter().filter(|r| r.success).count();
        let status = if succeeded > 0 {
            VideoStatus::Success
        } else {
            VideoStatus::Failed
        };
        info!(
            "Video {}: {} of {} destinations succeeded",
            video.sequence_index,
            succeeded,
            results.len()
        );

        VideoResult {
            video_index: video.sequence_index,
            status,
            policy: self.policy,
            detail: format!("{} of {} destinations succeeded", succeeded, results.len()),
            results,
        }
    }

    async fn first_success(&self, video: &VideoItem, destinations: &[Destination]) -> VideoResult {
        let mut results = Vec::new();

        for (i, destination) in destinations.iter().enumerate() {
            let outcome = attempt(self.platform.as_ref(), video, i + 1, destination).await;
            let done = outcome.success;
            results.push(outcome);
            if done {
                break;
            }
            debug!(
                "Video {}: destination {} failed, trying next",
                video.sequence_index,
                i + 1
            );
        }

        let (status, detail) = match results.last() {
            Some(last) if last.success => (VideoStatus::Success, last.message.clone()),
            Some(last) => (VideoStatus::Failed, last.message.clone()),
            None => (VideoStatus::Failed, "No destinations to try".to_string()),
        };
        info!(
            "Video {}: {} after {} attempt(s)",
            video.sequence_index,
            status,
            results.len()
        );

        VideoResult {
            video_index: video.sequence_index,
            status,
            policy: self.policy,
            detail,
            results,
        }
    }
}
