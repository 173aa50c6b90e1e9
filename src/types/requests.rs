//! Typed request descriptions accepted at the library boundary.
//!
//! Every struct rejects unknown fields, and required fields have no default,
//! so a malformed argument set fails here instead of halfway through a call.

use super::error::StorageError;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Decode a request description from a generic JSON argument object
pub fn from_arguments<T: DeserializeOwned>(arguments: serde_json::Value) -> Result<T, StorageError> {
    serde_json::from_value(arguments).map_err(|e| StorageError::InvalidRequest(e.to_string()))
}

/// Bucket-level target
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BucketRef {
    pub bucket_name: String,
}

/// Object-level target
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectRef {
    pub bucket_name: String,
    pub object_key: String,
}

/// Arguments for listing a single page of a bucket
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListObjectsRequest {
    pub bucket_name: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub max_keys: Option<u32>,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

/// Query parameters of one ListObjectsV2 call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListObjectsQuery {
    pub max_keys: u32,
    pub prefix: Option<String>,
    pub continuation_token: Option<String>,
}

impl ListObjectsQuery {
    pub fn new(max_keys: u32) -> Self {
        Self {
            max_keys,
            prefix: None,
            continuation_token: None,
        }
    }

    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_continuation_token(mut self, token: Option<String>) -> Self {
        self.continuation_token = token;
        self
    }
}

/// Arguments for uploading one object
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadRequest {
    pub bucket_name: String,
    pub object_key: String,
    pub content_base64: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl UploadRequest {
    pub fn from_bytes(
        bucket_name: impl Into<String>,
        object_key: impl Into<String>,
        content: &[u8],
        content_type: Option<String>,
    ) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            object_key: object_key.into(),
            content_base64: BASE64.encode(content),
            content_type,
        }
    }

    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    pub fn decode_content(&self) -> Result<Bytes, StorageError> {
        BASE64
            .decode(self.content_base64.trim())
            .map(Bytes::from)
            .map_err(|e| StorageError::InvalidRequest(format!("content_base64 is not valid base64: {}", e)))
    }
}

/// Arguments for replacing a bucket policy
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetBucketPolicyRequest {
    pub bucket_name: String,
    pub policy: serde_json::Value,
}

impl SetBucketPolicyRequest {
    /// Policy document as sent on the wire
    ///
    /// A policy given as a JSON string is assumed to already be a serialized document.
    pub fn policy_body(&self) -> Result<Bytes, StorageError> {
        match &self.policy {
            serde_json::Value::String(doc) => Ok(Bytes::from(doc.clone())),
            other => serde_json::to_vec(other)
                .map(Bytes::from)
                .map_err(|e| StorageError::InvalidRequest(e.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersioningStatus {
    Enabled,
    Suspended,
}

impl fmt::Display for VersioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersioningStatus::Enabled => f.write_str("Enabled"),
            VersioningStatus::Suspended => f.write_str("Suspended"),
        }
    }
}

/// Arguments for changing bucket versioning
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetBucketVersioningRequest {
    pub bucket_name: String,
    pub status: VersioningStatus,
}

/// Arguments for a size scan; no names means every bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanRequest {
    #[serde(default)]
    pub bucket_names: Option<Vec<String>>,
}
