//! Reupcast - paced video relay for page destinations
//!
//! This library publishes batches of staged videos to one or more destination
//! accounts on a remote video platform, one video at a time, streaming a
//! structured result for each video as soon as it is ready.

pub mod config;
pub mod error;
pub mod logging;
pub mod permissions;
pub mod platforms;
pub mod publish;
pub mod staging;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{ReupcastError, Result};
pub use publish::{BatchOrchestrator, BatchSummary, FanOutPolicy, VideoPublisher};
pub use types::{AttemptOutcome, BatchRequest, Destination, VideoItem, VideoResult, VideoStatus};
