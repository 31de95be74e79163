//! Graph API client
//!
//! Covers the three remote calls the relay needs: video ingestion, the
//! permission listing used by the pre-check, and the page listing that yields
//! destination tokens.

use async_trait::async_trait;
use reqwest::{multipart, Body, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::GraphConfig;
use crate::error::{PlatformError, ReupcastError, Result};
use crate::permissions::PermissionGrant;
use crate::platforms::{VideoPlatform, VideoUpload};

/// Fields requested for every page in [`GraphClient::list_pages`]
pub const PAGE_FIELDS: &str = "id,name,picture,fan_count,followers_count,access_token";

/// Graph codes that signal throttling regardless of HTTP status
const RATE_LIMIT_CODES: [i64; 4] = [4, 17, 32, 613];

/// Graph code for an invalid or expired access token
const INVALID_TOKEN_CODE: i64 = 190;

/// A page the user token can manage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<serde_json::Value>,
    #[serde(default)]
    pub fan_count: Option<u64>,
    #[serde(default)]
    pub followers_count: Option<u64>,
    /// Page access token, usable as a publish destination
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct CreatedVideo {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

/// Graph API client for video publishing and account queries
#[derive(Clone)]
pub struct GraphClient {
    http: Client,
    config: GraphConfig,
}

impl GraphClient {
    /// Create a client from the `[graph]` configuration section
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Network` if the HTTP client cannot be built.
    pub fn new(config: &GraphConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("reupcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlatformError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    fn videos_url(&self) -> String {
        format!(
            "{}/{}/me/videos",
            self.config.video_api_base.trim_end_matches('/'),
            self.config.api_version
        )
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// List the permissions granted to or declined by a user token
    pub async fn permissions(&self, token: &SecretString) -> Result<Vec<PermissionGrant>> {
        let response = self
            .http
            .get(self.api_url("me/permissions"))
            .query(&[("access_token", token.expose_secret())])
            .send()
            .await
            .map_err(|e| transport_error("permissions", e))?;

        let grants: DataEnvelope<PermissionGrant> =
            read_json(response, "permissions").await?;
        debug!("Fetched {} permission entries", grants.data.len());
        Ok(grants.data)
    }

    /// List the pages a user token manages, with their page access tokens
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::UnexpectedResponse` when no pages are found.
    pub async fn list_pages(&self, token: &SecretString) -> Result<Vec<Page>> {
        let response = self
            .http
            .get(self.api_url("me/accounts"))
            .query(&[("access_token", token.expose_secret()), ("fields", PAGE_FIELDS)])
            .send()
            .await
            .map_err(|e| transport_error("pages", e))?;

        let pages: DataEnvelope<Page> = read_json(response, "pages").await?;
        if pages.data.is_empty() {
            return Err(PlatformError::UnexpectedResponse("No pages found".to_string()).into());
        }

        info!("Fetched {} page(s)", pages.data.len());
        Ok(pages.data)
    }
}

#[async_trait]
impl VideoPlatform for GraphClient {
    fn name(&self) -> &str {
        "graph"
    }

    async fn publish_video(&self, upload: VideoUpload, credential: &SecretString) -> Result<String> {
        let VideoUpload {
            file,
            file_name,
            length,
            title,
        } = upload;

        let mime = mime_for(&file_name);
        let part = multipart::Part::stream_with_length(Body::from(file), length)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| PlatformError::Upload(format!("Invalid file part: {}", e)))?;

        let form = multipart::Form::new()
            .part("file", part)
            .text("access_token", credential.expose_secret().to_string())
            .text("description", title);

        let response = self
            .http
            .post(self.videos_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error("upload", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("upload", e))?;

        if status == StatusCode::OK || status == StatusCode::CREATED {
            let created: CreatedVideo = serde_json::from_str(&body).unwrap_or_default();
            return Ok(created.id.unwrap_or_default());
        }

        Err(map_graph_error(status, &body, "upload").into())
    }
}

fn mime_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next().map(|ext| ext.to_lowercase()) {
        Some(ext) if ext == "mp4" => "video/mp4",
        Some(ext) if ext == "mov" => "video/quicktime",
        Some(ext) if ext == "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(context, e))?;

    if !status.is_success() {
        return Err(map_graph_error(status, &body, context).into());
    }

    serde_json::from_str(&body).map_err(|e| {
        ReupcastError::from(PlatformError::UnexpectedResponse(format!(
            "Invalid {} response: {}",
            context, e
        )))
    })
}

fn transport_error(context: &str, error: reqwest::Error) -> PlatformError {
    if error.is_timeout() {
        return PlatformError::Network(format!("{} request timed out: {}", context, error));
    }
    PlatformError::Network(format!("{} request failed: {}", context, error))
}

/// Map a non-success Graph response to a `PlatformError`
///
/// Uses the `{"error": {"message", "code"}}` payload when the body carries one.
pub fn map_graph_error(status: StatusCode, body: &str, context: &str) -> PlatformError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let code = parsed.as_ref().and_then(|e| e.error.code);
    let message = match parsed {
        Some(envelope) => match code {
            Some(code) => format!("(#{}) {}", code, envelope.error.message),
            None => envelope.error.message,
        },
        None => format!("HTTP {}", status.as_u16()),
    };

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || code == Some(INVALID_TOKEN_CODE)
    {
        return PlatformError::Authentication(format!("{} failed: {}", context, message));
    }

    if status == StatusCode::TOO_MANY_REQUESTS
        || code.is_some_and(|c| RATE_LIMIT_CODES.contains(&c))
    {
        return PlatformError::RateLimit(format!("{} throttled: {}", context, message));
    }

    if status.is_client_error() && context == "upload" {
        return PlatformError::Upload(message);
    }

    PlatformError::UnexpectedResponse(format!("{} returned {}: {}", context, status.as_u16(), message))
}
