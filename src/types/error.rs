use serde::Serialize;
use thiserror::Error;

/// Errors produced by the storage core
#[derive(Debug, Error)]
pub enum StorageError {
    /// Credentials or endpoint are missing where they are required
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The endpoint answered with a non-success status
    #[error("request failed with HTTP {status}")]
    Status { status: u16, body: String },

    /// The request never produced a response (connect failure, timeout, broken body)
    #[error("transport error: {0}")]
    Transport(String),

    /// A response body could not be decoded
    #[error("parse error: {message}")]
    Parse { message: String, raw: String },

    /// A request description was rejected before anything was sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Coarse error classification callers match on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Transport,
    Parse,
    InvalidRequest,
}

/// Structured error payload handed back to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl StorageError {
    pub fn parse(message: impl Into<String>, raw: impl Into<String>) -> Self {
        StorageError::Parse {
            message: message.into(),
            raw: raw.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Configuration(_) => ErrorKind::Configuration,
            StorageError::Status { .. } => ErrorKind::Transport,
            StorageError::Transport(_) => ErrorKind::Transport,
            StorageError::Parse { .. } => ErrorKind::Parse,
            StorageError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    /// HTTP status of the failed call, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The offending response body, kept for debugging
    pub fn raw(&self) -> Option<&str> {
        match self {
            StorageError::Status { body, .. } => Some(body),
            StorageError::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
            status: self.status(),
            raw: self.raw().filter(|r| !r.is_empty()).map(str::to_string),
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StorageError::Transport(format!("request timed out: {}", err))
        } else if err.is_connect() {
            StorageError::Transport(format!("connection failed: {}", err))
        } else {
            StorageError::Transport(err.to_string())
        }
    }
}
