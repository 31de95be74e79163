//! Sequential multi-destination publish pipeline
//!
//! # Architecture
//!
//! - [`attempt`]: one upload of one video to one destination
//! - [`VideoPublisher`]: drives attempts across the destination list according
//!   to a [`FanOutPolicy`] and aggregates a [`VideoResult`](crate::VideoResult)
//! - [`BatchOrchestrator`]: walks the batch one video at a time, emits each
//!   result to a [`ProgressSink`], deletes the staged file and waits out the
//!   pacing interval
//! - [`EventBus`]: optional progress events for observers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use libreupcast::config::Config;
//! use libreupcast::platforms::graph::GraphClient;
//! use libreupcast::publish::{BatchOrchestrator, FanOutPolicy, JsonLinesSink, VideoPublisher};
//! use libreupcast::BatchRequest;
//!
//! # async fn example() -> libreupcast::Result<()> {
//! let config = Config::load()?;
//! let client = GraphClient::new(&config.graph)?;
//! let publisher = VideoPublisher::new(Arc::new(client), FanOutPolicy::Broadcast);
//!
//! let request = BatchRequest::from_intake(
//!     vec!["/tmp/video_1.mp4".into()],
//!     vec!["First clip".to_string()],
//!     vec!["PAGE_TOKEN".to_string()],
//!     5,
//! )?;
//!
//! let mut sink = JsonLinesSink::new(tokio::io::stdout());
//! let summary = BatchOrchestrator::new(publisher).run(request, &mut sink).await?;
//! println!("{} of {} videos published", summary.succeeded, summary.videos);
//! # Ok(())
//! # }
//! ```

pub mod attempt;
pub mod cleanup;
pub mod events;
pub mod orchestrator;
pub mod policy;
pub mod publisher;
pub mod sink;

pub use attempt::attempt;
pub use events::{BatchEvent, EventBus, EventReceiver};
pub use orchestrator::{BatchOrchestrator, BatchSummary};
pub use policy::FanOutPolicy;
pub use publisher::VideoPublisher;
pub use sink::{ChannelSink, JsonLinesSink, ProgressSink, TextSink};
