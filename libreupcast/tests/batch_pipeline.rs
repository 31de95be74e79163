//! End-to-end batch tests against the mock platform
//!
//! These drive `BatchOrchestrator` with real staged files on disk and check
//! ordering, pacing, cleanup and cancellation from the outside.

use async_trait::async_trait;
use libreupcast::platforms::mock::MockPlatform;
use libreupcast::publish::{BatchOrchestrator, ChannelSink, FanOutPolicy, JsonLinesSink, ProgressSink, VideoPublisher};
use libreupcast::types::{BatchRequest, Destination, VideoItem, VideoResult, VideoStatus};
use libreupcast::{ReupcastError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::watch;

/// Keeps every result with the moment it arrived
#[derive(Default)]
struct RecordingSink {
    received: Vec<(VideoResult, Instant)>,
    closes: usize,
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn accept(&mut self, result: &VideoResult) -> Result<()> {
        self.received.push((result.clone(), Instant::now()));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closes += 1;
        Ok(())
    }
}

/// Rejects every write
#[derive(Default)]
struct BrokenSink {
    attempts: usize,
    closes: usize,
}

#[async_trait]
impl ProgressSink for BrokenSink {
    async fn accept(&mut self, _result: &VideoResult) -> Result<()> {
        self.attempts += 1;
        Err(ReupcastError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "stdout closed",
        )))
    }

    async fn close(&mut self) -> Result<()> {
        self.closes += 1;
        Ok(())
    }
}

fn stage_videos(dir: &TempDir, count: usize) -> (Vec<VideoItem>, Vec<PathBuf>) {
    let videos: Vec<VideoItem> = (1..=count)
        .map(|i| {
            let path = dir.path().join(format!("video_{}.mp4", i));
            std::fs::write(&path, format!("payload {}", i)).unwrap();
            VideoItem::new(i, path, format!("Clip {}", i))
        })
        .collect();
    let paths = videos.iter().map(|v| v.source_path.clone()).collect();
    (videos, paths)
}

fn destinations(tokens: &[&str]) -> Vec<Destination> {
    tokens.iter().map(|t| Destination::new(*t).unwrap()).collect()
}

fn orchestrator(mock: &MockPlatform, policy: FanOutPolicy) -> BatchOrchestrator {
    BatchOrchestrator::new(VideoPublisher::new(Arc::new(mock.clone()), policy))
}

#[tokio::test]
async fn test_results_arrive_in_order_and_files_are_removed() {
    let temp_dir = TempDir::new().unwrap();
    let (videos, paths) = stage_videos(&temp_dir, 3);
    let mock = MockPlatform::success();

    let request = BatchRequest::new(videos, destinations(&["tok-a", "tok-b"]), Duration::ZERO);
    let mut sink = RecordingSink::default();
    let summary = orchestrator(&mock, FanOutPolicy::Broadcast)
        .run(request, &mut sink)
        .await
        .unwrap();

    let indices: Vec<usize> = sink.received.iter().map(|(r, _)| r.video_index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(sink.closes, 1);
    assert_eq!(summary.succeeded, 3);
    assert!(summary.all_succeeded());
    assert_eq!(mock.call_count(), 6);
    assert!(paths.iter().all(|p| !p.exists()));
}

#[tokio::test]
async fn test_first_success_fallback_scenario() {
    // Three videos, two destinations, the first destination always rejects
    let temp_dir = TempDir::new().unwrap();
    let (videos, paths) = stage_videos(&temp_dir, 3);
    let mock = MockPlatform::success().fail_for("tok-a", "(#200) Permissions error");

    let request = BatchRequest::new(videos, destinations(&["tok-a", "tok-b"]), Duration::ZERO);
    let mut sink = RecordingSink::default();
    let summary = orchestrator(&mock, FanOutPolicy::FirstSuccess)
        .run(request, &mut sink)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 3);
    for (result, _) in &sink.received {
        assert_eq!(result.status, VideoStatus::Success);
        assert_eq!(result.results.len(), 2);
        assert!(!result.results[0].success);
        assert_eq!(result.final_outcome().unwrap().destination, 2);
    }
    assert_eq!(
        mock.credentials_used(),
        vec!["tok-a", "tok-b", "tok-a", "tok-b", "tok-a", "tok-b"]
    );
    assert!(paths.iter().all(|p| !p.exists()));
}

#[tokio::test]
async fn test_failed_video_is_still_removed() {
    let temp_dir = TempDir::new().unwrap();
    let (videos, paths) = stage_videos(&temp_dir, 1);
    let mock = MockPlatform::failure("Network error: connection reset");

    let request = BatchRequest::new(videos, destinations(&["tok-a", "tok-b"]), Duration::ZERO);
    let mut sink = RecordingSink::default();
    let summary = orchestrator(&mock, FanOutPolicy::Broadcast)
        .run(request, &mut sink)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert!(!summary.all_succeeded());
    let (result, _) = &sink.received[0];
    assert_eq!(result.status, VideoStatus::Failed);
    assert!(result.results.iter().all(|r| !r.success));
    assert!(!paths[0].exists());
}

#[tokio::test]
async fn test_invalid_request_touches_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let (videos, paths) = stage_videos(&temp_dir, 2);
    let mock = MockPlatform::success();

    let request = BatchRequest::new(videos, Vec::new(), Duration::ZERO);
    let mut sink = RecordingSink::default();
    let err = orchestrator(&mock, FanOutPolicy::Broadcast)
        .run(request, &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, ReupcastError::InvalidInput(_)));
    assert_eq!(mock.call_count(), 0);
    assert!(sink.received.is_empty());
    assert!(paths.iter().all(|p| p.exists()));
}

#[tokio::test]
async fn test_pacing_between_videos_only() {
    let temp_dir = TempDir::new().unwrap();
    let (videos, _) = stage_videos(&temp_dir, 3);
    let mock = MockPlatform::success();
    let pacing = Duration::from_millis(150);

    let request = BatchRequest::new(videos, destinations(&["tok-a"]), pacing);
    let mut sink = RecordingSink::default();
    orchestrator(&mock, FanOutPolicy::Broadcast)
        .run(request, &mut sink)
        .await
        .unwrap();
    let finished = Instant::now();

    let calls = mock.calls();
    assert_eq!(calls.len(), 3);
    for i in 0..2 {
        let emitted = sink.received[i].1;
        assert!(calls[i + 1].started_at.duration_since(emitted) >= pacing);
    }
    // No wait after the last video
    assert!(finished.duration_since(sink.received[2].1) < pacing);
}

#[tokio::test]
async fn test_missing_file_fails_that_video_only() {
    let temp_dir = TempDir::new().unwrap();
    let (videos, paths) = stage_videos(&temp_dir, 3);
    std::fs::remove_file(&paths[1]).unwrap();
    let mock = MockPlatform::success();

    let request = BatchRequest::new(videos, destinations(&["tok-a"]), Duration::ZERO);
    let mut sink = RecordingSink::default();
    let summary = orchestrator(&mock, FanOutPolicy::Broadcast)
        .run(request, &mut sink)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    let (second, _) = &sink.received[1];
    assert_eq!(second.status, VideoStatus::Failed);
    assert!(second.results[0].message.contains("Failed to open staged file"));
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_sink_failure_does_not_stop_batch() {
    let temp_dir = TempDir::new().unwrap();
    let (videos, paths) = stage_videos(&temp_dir, 3);
    let mock = MockPlatform::success();

    let request = BatchRequest::new(videos, destinations(&["tok-a"]), Duration::ZERO);
    let mut sink = BrokenSink::default();
    let summary = orchestrator(&mock, FanOutPolicy::Broadcast)
        .run(request, &mut sink)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 3);
    assert_eq!(mock.call_count(), 3);
    // Writing stops after the first failure, close still happens once
    assert_eq!(sink.attempts, 1);
    assert_eq!(sink.closes, 1);
    assert!(paths.iter().all(|p| !p.exists()));
}

#[tokio::test]
async fn test_cancel_during_pacing() {
    let temp_dir = TempDir::new().unwrap();
    let (videos, paths) = stage_videos(&temp_dir, 3);
    let mock = MockPlatform::success();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let orchestrator = orchestrator(&mock, FanOutPolicy::Broadcast).with_shutdown(shutdown_rx);
    let (mut sink, mut receiver) = ChannelSink::channel();

    let consumer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(result) = receiver.recv().await {
            seen.push(result.video_index);
            shutdown_tx.send(true).unwrap();
        }
        seen
    });

    let request = BatchRequest::new(videos, destinations(&["tok-a"]), Duration::from_secs(600));
    let started = Instant::now();
    let summary = orchestrator.run(request, &mut sink).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(summary.cancelled);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(consumer.await.unwrap(), vec![1]);
    assert_eq!(mock.call_count(), 1);
    assert!(paths.iter().all(|p| !p.exists()));
}

#[tokio::test]
async fn test_cancel_while_upload_in_flight() {
    let temp_dir = TempDir::new().unwrap();
    let (videos, paths) = stage_videos(&temp_dir, 2);
    let mock = MockPlatform::success().with_delay(Duration::from_secs(600));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let orchestrator = orchestrator(&mock, FanOutPolicy::Broadcast).with_shutdown(shutdown_rx);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
    });

    let request = BatchRequest::new(videos, destinations(&["tok-a"]), Duration::ZERO);
    let mut sink = RecordingSink::default();
    let summary = orchestrator.run(request, &mut sink).await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.succeeded + summary.failed, 0);
    assert!(sink.received.is_empty());
    assert_eq!(sink.closes, 1);
    assert!(paths.iter().all(|p| !p.exists()));
}

/// Raises shutdown as soon as it receives a result
struct SignallingSink {
    shutdown: watch::Sender<bool>,
    received: usize,
}

#[async_trait]
impl ProgressSink for SignallingSink {
    async fn accept(&mut self, _result: &VideoResult) -> Result<()> {
        self.received += 1;
        let _ = self.shutdown.send(true);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_cancel_while_sink_is_blocked() {
    let temp_dir = TempDir::new().unwrap();
    let (videos, paths) = stage_videos(&temp_dir, 3);
    let mock = MockPlatform::success();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let orchestrator = orchestrator(&mock, FanOutPolicy::Broadcast).with_shutdown(shutdown_rx);
    // Nobody reads: the second result cannot be delivered
    let (mut sink, _receiver) = ChannelSink::channel();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();
    });

    let request = BatchRequest::new(videos, destinations(&["tok-a"]), Duration::ZERO);
    let summary = tokio::time::timeout(Duration::from_secs(3), orchestrator.run(request, &mut sink))
        .await
        .expect("batch did not stop while the sink was blocked")
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(mock.call_count(), 2);
    assert!(paths.iter().all(|p| !p.exists()));
}

#[tokio::test]
async fn test_shutdown_after_last_video_is_not_a_cancel() {
    let temp_dir = TempDir::new().unwrap();
    let (videos, paths) = stage_videos(&temp_dir, 1);
    let mock = MockPlatform::success();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let orchestrator = orchestrator(&mock, FanOutPolicy::Broadcast).with_shutdown(shutdown_rx);
    let mut sink = SignallingSink {
        shutdown: shutdown_tx,
        received: 0,
    };

    let request = BatchRequest::new(videos, destinations(&["tok-a"]), Duration::ZERO);
    let summary = orchestrator.run(request, &mut sink).await.unwrap();

    assert_eq!(sink.received, 1);
    assert!(!summary.cancelled);
    assert!(summary.all_succeeded());
    assert!(!paths[0].exists());
}

#[tokio::test]
async fn test_json_lines_output_for_batch() {
    let temp_dir = TempDir::new().unwrap();
    let (videos, _) = stage_videos(&temp_dir, 2);
    let mock = MockPlatform::success().fail_for("EAAB-second-token", "(#368) Blocked");

    let request = BatchRequest::new(
        videos,
        destinations(&["EAAB-first-token", "EAAB-second-token"]),
        Duration::ZERO,
    );
    let mut sink = JsonLinesSink::new(Vec::new());
    orchestrator(&mock, FanOutPolicy::Broadcast)
        .run(request, &mut sink)
        .await
        .unwrap();

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let records: Vec<serde_json::Value> = output
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["video_index"], 1);
    assert_eq!(records[0]["status"], "success");
    assert_eq!(records[0]["results"][1]["destination"], 2);
    assert_eq!(records[0]["results"][1]["success"], false);
    // Raw tokens never reach the output
    assert!(!output.contains("EAAB-first-token"));
    assert!(!output.contains("EAAB-second-token"));
}
