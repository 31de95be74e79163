//! Progress sinks: where per-video results go as soon as they are ready

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::{ReupcastError, Result};
use crate::types::VideoResult;

/// Consumer of per-video results
///
/// `accept` is called once per video in batch order and `close` exactly once
/// after the last video. Implementations should not buffer the whole batch.
#[async_trait]
pub trait ProgressSink: Send {
    async fn accept(&mut self, result: &VideoResult) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

fn closed_error() -> ReupcastError {
    ReupcastError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "progress sink is closed",
    ))
}

/// Newline-delimited JSON, flushed after every record
pub struct JsonLinesSink<W> {
    writer: W,
    closed: bool,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            closed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ProgressSink for JsonLinesSink<W> {
    async fn accept(&mut self, result: &VideoResult) -> Result<()> {
        if self.closed {
            return Err(closed_error());
        }
        let mut line = serde_json::to_vec(result)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// One human-readable line per video
pub struct TextSink<W> {
    writer: W,
    closed: bool,
}

impl<W: AsyncWrite + Unpin + Send> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            closed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Render a result as a single line
pub fn format_text(result: &VideoResult) -> String {
    let attempts: Vec<String> = result
        .results
        .iter()
        .map(|r| {
            let mark = if r.success { "ok" } else { "failed" };
            format!("#{} {}: {}", r.destination, mark, r.message)
        })
        .collect();
    format!(
        "video {}: {} ({}) [{}]",
        result.video_index,
        result.status,
        result.detail,
        attempts.join("; ")
    )
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ProgressSink for TextSink<W> {
    async fn accept(&mut self, result: &VideoResult) -> Result<()> {
        if self.closed {
            return Err(closed_error());
        }
        let line = format_text(result) + "\n";
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Hands results to an in-process consumer over a one-slot channel
///
/// The orchestrator waits in `accept` until the consumer has taken the
/// previous result. Closing drops the sender, ending the receiver's stream.
pub struct ChannelSink {
    sender: Option<mpsc::Sender<VideoResult>>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::Receiver<VideoResult>) {
        let (sender, receiver) = mpsc::channel(1);
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn accept(&mut self, result: &VideoResult) -> Result<()> {
        let sender = self.sender.as_ref().ok_or_else(closed_error)?;
        sender.send(result.clone()).await.map_err(|_| {
            ReupcastError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "progress receiver dropped",
            ))
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.sender.take();
        Ok(())
    }
}
