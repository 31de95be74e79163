//! Fan-out policies

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a video is spread over the destination list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FanOutPolicy {
    /// Upload to every destination; the video succeeds if any upload does
    #[default]
    Broadcast,
    /// Try destinations in order and stop at the first successful upload
    FirstSuccess,
}

impl FromStr for FanOutPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "broadcast" | "all" => Ok(FanOutPolicy::Broadcast),
            "first-success" | "first_success" | "fallback" => Ok(FanOutPolicy::FirstSuccess),
            _ => Err(format!(
                "Invalid fan-out policy: '{}'. Valid options: broadcast, first-success",
                s
            )),
        }
    }
}

impl std::fmt::Display for FanOutPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FanOutPolicy::Broadcast => write!(f, "broadcast"),
            FanOutPolicy::FirstSuccess => write!(f, "first-success"),
        }
    }
}
