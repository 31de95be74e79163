//! Mock platform implementation for testing
//!
//! A configurable stand-in for the remote platform. Each credential can be set
//! to succeed or fail, uploads can be delayed to simulate latency, and every
//! call is recorded so tests can check attempt order, counts, timing and the
//! bytes actually streamed.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::time::sleep;

use crate::error::{PlatformError, Result};
use crate::platforms::{VideoPlatform, VideoUpload};

/// What the mock does for a credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    Succeed,
    Fail(String),
}

/// One recorded publish call
#[derive(Debug, Clone)]
pub struct MockCall {
    pub credential: String,
    pub title: String,
    pub file_name: String,
    /// Bytes read from the upload stream
    pub bytes: Vec<u8>,
    pub started_at: Instant,
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,
    /// Behavior for credentials without an override
    pub default_behavior: MockBehavior,
    pub overrides: HashMap<String, MockBehavior>,
    /// Delay before completing each upload (simulates network latency)
    pub delay: Duration,
    pub calls: Arc<Mutex<Vec<MockCall>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            default_behavior: MockBehavior::Succeed,
            overrides: HashMap::new(),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock platform for testing
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    config: MockConfig,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// A platform on which every upload succeeds
    pub fn success() -> Self {
        Self::default()
    }

    /// A platform on which every upload fails with `error`
    pub fn failure(error: &str) -> Self {
        Self::new(MockConfig {
            default_behavior: MockBehavior::Fail(error.to_string()),
            ..Default::default()
        })
    }

    /// Make uploads with `credential` fail with `error`
    pub fn fail_for(mut self, credential: &str, error: &str) -> Self {
        self.config
            .overrides
            .insert(credential.to_string(), MockBehavior::Fail(error.to_string()));
        self
    }

    /// Make uploads with `credential` succeed
    pub fn succeed_for(mut self, credential: &str) -> Self {
        self.config
            .overrides
            .insert(credential.to_string(), MockBehavior::Succeed);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.config.delay = delay;
        self
    }

    fn call_log(&self) -> MutexGuard<'_, Vec<MockCall>> {
        self.config.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn call_count(&self) -> usize {
        self.call_log().len()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log().clone()
    }

    /// Credentials in the order they were used
    pub fn credentials_used(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.credential).collect()
    }

    fn behavior_for(&self, credential: &str) -> MockBehavior {
        self.config
            .overrides
            .get(credential)
            .cloned()
            .unwrap_or_else(|| self.config.default_behavior.clone())
    }
}

#[async_trait]
impl VideoPlatform for MockPlatform {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn publish_video(&self, upload: VideoUpload, credential: &SecretString) -> Result<String> {
        let started_at = Instant::now();
        let VideoUpload {
            mut file,
            file_name,
            title,
            ..
        } = upload;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).await?;

        let credential = credential.expose_secret().to_string();
        let call_number = {
            let mut calls = self.call_log();
            calls.push(MockCall {
                credential: credential.clone(),
                title,
                file_name,
                bytes,
                started_at,
            });
            calls.len()
        };

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        match self.behavior_for(&credential) {
            MockBehavior::Succeed => Ok(format!("{}-video-{}", self.config.name, call_number)),
            MockBehavior::Fail(error) => Err(PlatformError::Upload(error).into()),
        }
    }
}
