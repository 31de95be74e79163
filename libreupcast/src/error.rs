//! Error types for Reupcast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReupcastError>;

#[derive(Error, Debug)]
pub enum ReupcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Token store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cancelled")]
    Cancelled,
}

impl ReupcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ReupcastError::InvalidInput(_) => 3,
            ReupcastError::Platform(PlatformError::Authentication(_))
            | ReupcastError::Platform(PlatformError::Permission(_)) => 2,
            ReupcastError::Platform(_) => 1,
            ReupcastError::Config(_) => 1,
            ReupcastError::Store(StoreError::NotFound(_)) => 3,
            ReupcastError::Store(_) => 1,
            ReupcastError::Io(_) => 1,
            ReupcastError::Serialization(_) => 1,
            ReupcastError::Cancelled => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors reported by the remote video platform or the transport to it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Permission check failed: {0}")]
    Permission(String),

    #[error("Upload rejected: {0}")]
    Upload(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Token not found: {0}")]
    NotFound(String),

    #[error("Malformed token file {file}: {reason}")]
    Malformed { file: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
