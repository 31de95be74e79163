//! Permission pre-check for user tokens
//!
//! A token must hold every permission in [`REQUIRED_PERMISSIONS`] with status
//! `granted` before any video is published with it.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PlatformError, Result};
use crate::platforms::graph::GraphClient;

pub const REQUIRED_PERMISSIONS: [&str; 5] = [
    "publish_video",
    "pages_manage_posts",
    "pages_manage_engagement",
    "pages_read_engagement",
    "pages_read_user_content",
];

/// One entry of the platform's permission listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub permission: String,
    pub status: String,
}

impl PermissionGrant {
    pub fn is_granted(&self) -> bool {
        self.status == "granted"
    }
}

/// Required permissions that are absent or not granted, in required order
pub fn missing_permissions(grants: &[PermissionGrant]) -> Vec<&'static str> {
    REQUIRED_PERMISSIONS
        .iter()
        .copied()
        .filter(|required| {
            !grants
                .iter()
                .any(|g| g.permission == *required && g.is_granted())
        })
        .collect()
}

/// Fail with the full list of missing permissions
pub fn verify_permissions(grants: &[PermissionGrant]) -> Result<()> {
    let missing = missing_permissions(grants);
    if missing.is_empty() {
        return Ok(());
    }
    Err(PlatformError::Permission(format!(
        "Missing required permissions: {}",
        missing.join(", ")
    ))
    .into())
}

/// Fetch a token's permissions and verify them
pub async fn check_token(client: &GraphClient, token: &SecretString) -> Result<()> {
    let grants = client.permissions(token).await?;
    verify_permissions(&grants)?;
    info!("Permission check passed");
    Ok(())
}
