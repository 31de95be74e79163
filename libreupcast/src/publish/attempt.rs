//! A single publish attempt

use tracing::{info, warn};

use crate::platforms::{VideoPlatform, VideoUpload};
use crate::types::{AttemptOutcome, Destination, VideoItem};

/// Upload `video` once to the destination at 1-based `position`
///
/// The staged file is opened afresh for every attempt and never modified or
/// deleted here. Every failure, including failing to open the file, becomes a
/// failed outcome; nothing is retried.
pub async fn attempt(
    platform: &dyn VideoPlatform,
    video: &VideoItem,
    position: usize,
    destination: &Destination,
) -> AttemptOutcome {
    let hint = destination.hint();
    info!(
        "Publishing video {} to destination {} ({}) via {}",
        video.sequence_index,
        position,
        hint,
        platform.name()
    );

    let upload = match VideoUpload::open(&video.source_path, &video.title).await {
        Ok(upload) => upload,
        Err(e) => {
            warn!(
                "Cannot read staged file {}: {}",
                video.source_path.display(),
                e
            );
            return AttemptOutcome {
                destination: position,
                credential: hint,
                success: false,
                message: format!("Failed to open staged file: {}", e),
            };
        }
    };

    match platform.publish_video(upload, destination.credential()).await {
        Ok(video_id) => {
            info!(
                "Video {} published to destination {}",
                video.sequence_index, position
            );
            let message = if video_id.is_empty() {
                "Upload successful".to_string()
            } else {
                format!("Upload successful (video id {})", video_id)
            };
            AttemptOutcome {
                destination: position,
                credential: hint,
                success: true,
                message,
            }
        }
        Err(e) => {
            warn!(
                "Failed to publish video {} to destination {}: {}",
                video.sequence_index, position, e
            );
            AttemptOutcome {
                destination: position,
                credential: hint,
                success: false,
                message: e.to_string(),
            }
        }
    }
}
