//! Batch progress events
//!
//! The orchestrator publishes lifecycle events on a `tokio::sync::broadcast`
//! channel. Emitting never blocks: with no subscribers the event is dropped,
//! and a lagging subscriber loses the oldest events rather than slowing the
//! batch down.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::VideoStatus;

pub type EventReceiver = broadcast::Receiver<BatchEvent>;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BatchEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: BatchEvent) {
        // send() fails only when nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    BatchStarted {
        videos: usize,
        destinations: usize,
    },
    VideoStarted {
        video_index: usize,
        title: String,
    },
    VideoCompleted {
        video_index: usize,
        status: VideoStatus,
        attempts: usize,
    },
    PacingStarted {
        video_index: usize,
        wait_ms: u64,
    },
    BatchCompleted {
        succeeded: usize,
        failed: usize,
        cancelled: bool,
    },
}
