//! Batch orchestration: one video at a time, paced, with guaranteed cleanup

use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::watch;
use tracing::{info, warn};

use super::cleanup::StagedFile;
use super::events::{BatchEvent, EventBus, EventReceiver};
use super::publisher::VideoPublisher;
use super::sink::ProgressSink;
use crate::error::Result;
use crate::types::BatchRequest;

/// Counts for a finished (or cancelled) batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub videos: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        !self.cancelled && self.failed == 0 && self.succeeded == self.videos
    }
}

/// Runs a batch through a [`VideoPublisher`]
///
/// Videos are processed strictly in order. For each video the result is
/// handed to the sink, then the staged file is deleted whatever the outcome,
/// then (unless it was the last video) the pacing interval is waited out.
pub struct BatchOrchestrator {
    publisher: VideoPublisher,
    events: EventBus,
    shutdown: Option<watch::Receiver<bool>>,
}

impl BatchOrchestrator {
    pub fn new(publisher: VideoPublisher) -> Self {
        Self {
            publisher,
            events: EventBus::default(),
            shutdown: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Stop the batch once `true` is sent on the channel
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Publish every video of `request`, streaming results to `sink`
    ///
    /// # Errors
    ///
    /// Only input validation fails the call, and it does so before any
    /// upload is attempted or any staged file is touched. Per-video and
    /// per-destination failures are reported through the sink.
    pub async fn run<S>(&self, request: BatchRequest, sink: &mut S) -> Result<BatchSummary>
    where
        S: ProgressSink + ?Sized,
    {
        request.validate()?;

        let BatchRequest {
            videos,
            destinations,
            pacing_interval,
        } = request;

        info!(
            "Starting batch: {} video(s), {} destination(s), policy {}, pacing {:?}",
            videos.len(),
            destinations.len(),
            self.publisher.policy(),
            pacing_interval
        );
        self.events.emit(BatchEvent::BatchStarted {
            videos: videos.len(),
            destinations: destinations.len(),
        });

        let mut shutdown = self.shutdown.clone();
        let mut summary = BatchSummary {
            videos: videos.len(),
            ..Default::default()
        };
        let mut sink_healthy = true;
        let mut queue = videos.into_iter().peekable();

        while let Some(video) = queue.next() {
            let staged = StagedFile::new(&video.source_path);

            if is_cancelled(&shutdown) {
                staged.remove().await;
                summary.cancelled = true;
                break;
            }

            self.events.emit(BatchEvent::VideoStarted {
                video_index: video.sequence_index,
                title: video.title.clone(),
            });

            let publish = self.publisher.publish(&video, &destinations);
            let result = match until_cancelled(&mut shutdown, publish).await {
                Some(result) => result,
                None => {
                    warn!(
                        "Batch cancelled while video {} was in flight",
                        video.sequence_index
                    );
                    staged.remove().await;
                    summary.cancelled = true;
                    break;
                }
            };

            if result.status.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }

            if sink_healthy {
                match until_cancelled(&mut shutdown, sink.accept(&result)).await {
                    Some(Ok(())) => {}
                    Some(Err(e)) => {
                        warn!(
                            "Progress sink rejected result for video {}: {}",
                            result.video_index, e
                        );
                        sink_healthy = false;
                    }
                    None => {
                        warn!(
                            "Batch cancelled while emitting result for video {}",
                            result.video_index
                        );
                        staged.remove().await;
                        summary.cancelled = true;
                        break;
                    }
                }
            }

            self.events.emit(BatchEvent::VideoCompleted {
                video_index: result.video_index,
                status: result.status,
                attempts: result.results.len(),
            });

            staged.remove().await;

            if queue.peek().is_none() {
                break;
            }

            if is_cancelled(&shutdown) {
                summary.cancelled = true;
                break;
            }

            if !pacing_interval.is_zero() {
                info!(
                    "Waiting {:?} before video {}",
                    pacing_interval,
                    video.sequence_index + 1
                );
                self.events.emit(BatchEvent::PacingStarted {
                    video_index: video.sequence_index,
                    wait_ms: pacing_interval.as_millis() as u64,
                });
                let pause = tokio::time::sleep(pacing_interval);
                if until_cancelled(&mut shutdown, pause).await.is_none() {
                    summary.cancelled = true;
                    break;
                }
            }
        }

        if summary.cancelled {
            let remaining: Vec<_> = queue.collect();
            if !remaining.is_empty() {
                warn!(
                    "Batch cancelled, discarding {} unpublished video(s)",
                    remaining.len()
                );
            }
            for video in remaining {
                StagedFile::new(video.source_path).remove().await;
            }
        }

        if let Err(e) = sink.close().await {
            warn!("Failed to close progress sink: {}", e);
        }

        self.events.emit(BatchEvent::BatchCompleted {
            succeeded: summary.succeeded,
            failed: summary.failed,
            cancelled: summary.cancelled,
        });
        info!(
            "Batch finished: {} succeeded, {} failed{}",
            summary.succeeded,
            summary.failed,
            if summary.cancelled { " (cancelled)" } else { "" }
        );

        Ok(summary)
    }
}

fn is_cancelled(shutdown: &Option<watch::Receiver<bool>>) -> bool {
    shutdown.as_ref().is_some_and(|rx| *rx.borrow())
}

/// Drive `fut` to completion unless shutdown is signalled first
async fn until_cancelled<F: Future>(
    shutdown: &mut Option<watch::Receiver<bool>>,
    fut: F,
) -> Option<F::Output> {
    match shutdown {
        None => Some(fut.await),
        Some(rx) => tokio::select! {
            biased;
            _ = wait_for_shutdown(rx) => None,
            output = fut => Some(output),
        },
    }
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone without signalling: shutdown can no longer happen
            std::future::pending::<()>().await;
        }
    }
}
