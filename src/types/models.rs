use super::error::ErrorPayload;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// XML namespace S3 uses on listing documents
pub const S3_XML_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Last-modified value of a listed object
///
/// Endpoints are not consistent about timestamp formatting, so anything that
/// does not parse as RFC 3339 is kept verbatim instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LastModified {
    Parsed(DateTime<Utc>),
    Raw(String),
}

impl LastModified {
    pub fn from_text(text: &str) -> Self {
        match DateTime::parse_from_rfc3339(text) {
            Ok(dt) => LastModified::Parsed(dt.with_timezone(&Utc)),
            Err(_) => LastModified::Raw(text.to_string()),
        }
    }
}

/// One row of a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<LastModified>,
}

/// One decoded page of a ListObjectsV2 response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingPage {
    pub entries: Vec<ObjectEntry>,
    pub is_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

impl ListingPage {
    /// Token for the next call, only when the server says there is more
    pub fn next_token(&self) -> Option<&str> {
        if self.is_truncated {
            self.continuation_token.as_deref()
        } else {
            None
        }
    }
}

/// A single listing page as returned to callers of `list_objects`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectListing {
    pub bucket: String,
    pub objects: Vec<ObjectEntry>,
    pub count: usize,
    pub is_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_continuation_token: Option<String>,
}

/// Totals for one fully scanned bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketStats {
    pub bucket: String,
    pub objects: u64,
    pub bytes: u64,
    pub size: String,
}

/// A bucket whose scan did not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketFailure {
    pub bucket: String,
    pub error: ErrorPayload,
}

/// Result of a multi-bucket scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    pub buckets: Vec<BucketStats>,
    pub failed: Vec<BucketFailure>,
    pub total_objects: u64,
    pub total_bytes: u64,
    pub total_size: String,
}

/// Receipt for a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Downloaded object with its payload as base64 text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedObject {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub size: u64,
    pub content_base64: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteReceipt {
    pub bucket: String,
    pub key: String,
    pub status: u16,
}

/// Render a byte count with base-1024 units
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// S3 XML response for ListObjectsV2
#[derive(Serialize)]
#[serde(rename = "ListBucketResult")]
pub struct ListBucketResult {
    #[serde(rename = "@xmlns", skip_serializing_if = "Option::is_none")]
    pub xmlns: Option<String>,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Prefix", skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(rename = "KeyCount")]
    pub key_count: usize,
    #[serde(rename = "MaxKeys")]
    pub max_keys: usize,
    #[serde(rename = "IsTruncated")]
    pub is_truncated: bool,
    #[serde(rename = "NextContinuationToken", skip_serializing_if = "Option::is_none")]
    pub next_continuation_token: Option<String>,
    #[serde(rename = "Contents")]
    pub contents: Vec<S3Object>,
}

#[derive(Serialize)]
#[serde(rename = "Contents")]
pub struct S3Object {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "LastModified")]
    pub last_modified: String,
    #[serde(rename = "Size")]
    pub size: u64,
    #[serde(rename = "StorageClass")]
    pub storage_class: String,
}

/// S3 XML response for ListBuckets
#[derive(Serialize)]
#[serde(rename = "ListAllMyBucketsResult")]
pub struct ListAllMyBucketsResult {
    #[serde(rename = "@xmlns", skip_serializing_if = "Option::is_none")]
    pub xmlns: Option<String>,
    #[serde(rename = "Buckets")]
    pub buckets: BucketList,
}

#[derive(Serialize)]
pub struct BucketList {
    #[serde(rename = "Bucket")]
    pub bucket: Vec<BucketEntry>,
}

#[derive(Serialize)]
pub struct BucketEntry {
    #[serde(rename = "Name")]
    pub name: String,
}

/// S3 XML request body for PutBucketVersioning
#[derive(Serialize)]
#[serde(rename = "VersioningConfiguration")]
pub struct VersioningConfiguration {
    #[serde(rename = "@xmlns")]
    pub xmlns: &'static str,
    #[serde(rename = "Status")]
    pub status: String,
}
