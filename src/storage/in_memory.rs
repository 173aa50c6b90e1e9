use super::backend::ObjectStore;
use crate::listing::{parse_bucket_names, parse_listing};
use crate::types::requests::{DEFAULT_CONTENT_TYPE, ListObjectsQuery, ObjectRef, UploadRequest};
use crate::types::{
    BucketEntry, BucketList, DeleteReceipt, DownloadedObject, ListAllMyBucketsResult,
    ListBucketResult, ListingPage, S3_XML_NAMESPACE, S3Object, StorageError, UploadReceipt,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use quick_xml::se::to_string as to_xml_string;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory object store for testing and dry runs
///
/// Listings are rendered to real ListObjectsV2 XML and fed back through the
/// listing parser, so callers see exactly what a remote endpoint would give.
#[derive(Clone)]
pub struct InMemoryStore {
    buckets: Arc<RwLock<BTreeMap<String, BTreeMap<String, StoredObject>>>>,
    namespaced: bool,
}

#[derive(Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    last_modified: chrono::DateTime<chrono::Utc>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            buckets: Arc::new(RwLock::new(BTreeMap::new())),
            namespaced: true,
        }
    }

    /// Render listings without the S3 namespace declaration
    pub fn without_namespace(mut self) -> Self {
        self.namespaced = false;
        self
    }

    pub async fn create_bucket(&self, bucket: &str) {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default();
    }

    /// Store an object directly, creating the bucket if needed
    pub async fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        let stored = StoredObject {
            data: data.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            last_modified: chrono::Utc::now(),
        };
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), stored);
    }

    fn xmlns(&self) -> Option<String> {
        self.namespaced.then(|| S3_XML_NAMESPACE.to_string())
    }

    fn no_such_bucket(bucket: &str) -> StorageError {
        StorageError::Status {
            status: 404,
            body: format!(
                "<Error><Code>NoSuchBucket</Code><Message>The specified bucket does not exist.</Message><BucketName>{}</BucketName></Error>",
                bucket
            ),
        }
    }

    fn no_such_key(key: &str) -> StorageError {
        StorageError::Status {
            status: 404,
            body: format!(
                "<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message><Key>{}</Key></Error>",
                key
            ),
        }
    }

    fn render(&self, document: &impl serde::Serialize) -> Result<String, StorageError> {
        let xml = to_xml_string(document)
            .map_err(|e| StorageError::InvalidRequest(format!("failed to serialize XML: {}", e)))?;
        Ok(format!(r#"<?xml version="1.0" encoding="UTF-8"?>{}"#, xml))
    }

    /// Build the ListObjectsV2 document for one page
    async fn render_listing(
        &self,
        bucket: &str,
        query: &ListObjectsQuery,
    ) -> Result<String, StorageError> {
        let buckets = self.buckets.read().await;
        let objects = buckets.get(bucket).ok_or_else(|| Self::no_such_bucket(bucket))?;

        let start = match &query.continuation_token {
            Some(token) => {
                let decoded = BASE64
                    .decode(token)
                    .ok()
                    .and_then(|raw| String::from_utf8(raw).ok())
                    .ok_or_else(|| StorageError::Status {
                        status: 400,
                        body: "<Error><Code>InvalidArgument</Code><Message>The continuation token provided is incorrect</Message></Error>".to_string(),
                    })?;
                Bound::Excluded(decoded)
            }
            None => Bound::Unbounded,
        };

        let prefix = query.prefix.as_deref().unwrap_or("");
        let max_keys = query.max_keys as usize;
        let mut matching = objects
            .range((start, Bound::Unbounded))
            .filter(|(key, _)| key.starts_with(prefix));

        let contents: Vec<S3Object> = matching
            .by_ref()
            .take(max_keys)
            .map(|(key, obj)| S3Object {
                key: key.clone(),
                last_modified: obj
                    .last_modified
                    .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                size: obj.data.len() as u64,
                storage_class: "STANDARD".to_string(),
            })
            .collect();

        let is_truncated = max_keys > 0 && matching.next().is_some();
        let next_continuation_token = match contents.last() {
            Some(last) if is_truncated => Some(BASE64.encode(last.key.as_bytes())),
            _ => None,
        };

        self.render(&ListBucketResult {
            xmlns: self.xmlns(),
            name: bucket.to_string(),
            prefix: query.prefix.clone(),
            key_count: contents.len(),
            max_keys,
            is_truncated,
            next_continuation_token,
            contents,
        })
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryStore {
    async fn list_buckets(&self) -> Result<Vec<String>, StorageError> {
        let names: Vec<BucketEntry> = self
            .buckets
            .read()
            .await
            .keys()
            .map(|name| BucketEntry { name: name.clone() })
            .collect();

        let xml = self.render(&ListAllMyBucketsResult {
            xmlns: self.xmlns(),
            buckets: BucketList { bucket: names },
        })?;
        parse_bucket_names(&xml)
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        query: &ListObjectsQuery,
    ) -> Result<ListingPage, StorageError> {
        let xml = self.render_listing(bucket, query).await?;
        parse_listing(&xml)
    }

    async fn upload_object(&self, request: &UploadRequest) -> Result<UploadReceipt, StorageError> {
        let data = request.decode_content()?;
        let size = data.len() as u64;
        let etag = {
            use sha2::{Digest, Sha256};
            format!("\"{}\"", hex::encode(Sha256::digest(&data)))
        };

        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(&request.bucket_name)
            .ok_or_else(|| Self::no_such_bucket(&request.bucket_name))?;
        objects.insert(
            request.object_key.clone(),
            StoredObject {
                data,
                content_type: request.content_type().to_string(),
                last_modified: chrono::Utc::now(),
            },
        );

        Ok(UploadReceipt {
            bucket: request.bucket_name.clone(),
            key: request.object_key.clone(),
            size,
            status: 200,
            etag: Some(etag),
        })
    }

    async fn download_object(&self, target: &ObjectRef) -> Result<DownloadedObject, StorageError> {
        let buckets = self.buckets.read().await;
        let obj = buckets
            .get(&target.bucket_name)
            .ok_or_else(|| Self::no_such_bucket(&target.bucket_name))?
            .get(&target.object_key)
            .ok_or_else(|| Self::no_such_key(&target.object_key))?;

        Ok(DownloadedObject {
            bucket: target.bucket_name.clone(),
            key: target.object_key.clone(),
            content_type: obj.content_type.clone(),
            size: obj.data.len() as u64,
            content_base64: BASE64.encode(&obj.data),
        })
    }

    async fn delete_object(&self, target: &ObjectRef) -> Result<DeleteReceipt, StorageError> {
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(&target.bucket_name)
            .ok_or_else(|| Self::no_such_bucket(&target.bucket_name))?;

        // S3 returns success even if the object doesn't exist
        objects.remove(&target.object_key);

        Ok(DeleteReceipt {
            bucket: target.bucket_name.clone(),
            key: target.object_key.clone(),
            status: 204,
        })
    }
}
