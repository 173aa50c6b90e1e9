use super::backend::ObjectStore;
use super::executor::{Executor, RawResponse, ResponseBody, Timeout, Timeouts};
use crate::auth::{Credentials, SignableRequest, encode_segment, prepare};
use crate::listing::{parse_bucket_names, parse_listing};
use crate::types::requests::{
    BucketRef, ListObjectsQuery, ObjectRef, SetBucketPolicyRequest, SetBucketVersioningRequest,
    UploadRequest,
};
use crate::types::{
    DeleteReceipt, DownloadedObject, ListingPage, S3_XML_NAMESPACE, StorageError, UploadReceipt,
    VersioningConfiguration,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use quick_xml::se::to_string as to_xml_string;
use reqwest::Method;
use url::Url;

/// Client for one S3-compatible endpoint
///
/// Holds the credentials it signs with; build one per endpoint and share it.
/// Each request attempt reads the clock once and is signed against that
/// instant, so nothing here ever reuses a signature.
pub struct S3Client {
    endpoint: Url,
    credentials: Credentials,
    executor: Executor,
}

impl S3Client {
    pub fn new(
        endpoint: &str,
        credentials: Credentials,
        timeouts: Timeouts,
    ) -> Result<Self, StorageError> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(StorageError::Configuration(
                "object storage endpoint is not configured".to_string(),
            ));
        }

        let endpoint = Url::parse(endpoint).map_err(|e| {
            StorageError::Configuration(format!("invalid endpoint URL '{}': {}", endpoint, e))
        })?;
        if endpoint.cannot_be_a_base() || endpoint.host_str().is_none() {
            return Err(StorageError::Configuration(format!(
                "endpoint URL '{}' has no host",
                endpoint
            )));
        }

        if !credentials.is_complete() {
            tracing::info!("No complete credential pair, requests will be sent unauthenticated");
        }

        Ok(Self {
            endpoint,
            credentials,
            executor: Executor::new(timeouts)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// URL of a bucket, or of an object inside it when `key` is given
    ///
    /// Segments are S3-encoded here so the path on the wire is the canonical
    /// URI the signer sees. Keys with a `.` or `..` segment are rejected: URL
    /// normalization would send them to a different object.
    fn bucket_url(&self, bucket: &str, key: Option<&str>) -> Result<Url, StorageError> {
        if bucket.is_empty() {
            return Err(StorageError::InvalidRequest("bucket name is empty".to_string()));
        }
        if matches!(bucket, "." | "..") {
            return Err(StorageError::InvalidRequest(format!(
                "bucket name '{}' is not addressable",
                bucket
            )));
        }
        if let Some(key) = key {
            if key.is_empty() {
                return Err(StorageError::InvalidRequest("object key is empty".to_string()));
            }
            if key.split('/').any(|segment| matches!(segment, "." | "..")) {
                return Err(StorageError::InvalidRequest(format!(
                    "object key '{}' has a '.' or '..' segment and cannot be addressed by URL",
                    key
                )));
            }
        }

        let mut path = self.endpoint.path().trim_end_matches('/').to_string();
        path.push('/');
        path.push_str(&encode_segment(bucket));
        if let Some(key) = key {
            for segment in key.split('/') {
                path.push('/');
                path.push_str(&encode_segment(segment));
            }
        }

        let mut url = self.endpoint.clone();
        url.set_query(None);
        url.set_path(&path);
        Ok(url)
    }

    fn subresource_url(&self, bucket: &str, subresource: &str) -> Result<Url, StorageError> {
        let mut url = self.bucket_url(bucket, None)?;
        url.set_query(Some(subresource));
        Ok(url)
    }

    /// Sign against the current time and send, classifying the response
    async fn send(
        &self,
        request: SignableRequest,
        timeout: Timeout,
    ) -> Result<ResponseBody, StorageError> {
        let signed = prepare(&self.credentials, request, chrono::Utc::now())?;
        self.executor.execute(signed, timeout).await
    }

    /// Sign against the current time and send, keeping the body untouched
    async fn send_raw(
        &self,
        request: SignableRequest,
        timeout: Timeout,
    ) -> Result<RawResponse, StorageError> {
        let signed = prepare(&self.credentials, request, chrono::Utc::now())?;
        self.executor.execute_raw(signed, timeout).await
    }

    /// Fetch a document expected to be XML
    ///
    /// Some deployments omit or mislabel the content type on listings, so an
    /// unclassified body is handed to the parser as text too.
    async fn fetch_xml(&self, request: SignableRequest) -> Result<String, StorageError> {
        match self.send(request, Timeout::Control).await? {
            ResponseBody::Xml(text) => Ok(text),
            ResponseBody::Raw { body, .. } => Ok(String::from_utf8_lossy(&body).into_owned()),
            ResponseBody::Json(value) => Err(StorageError::parse(
                "expected an XML document, got JSON",
                value.to_string(),
            )),
        }
    }

    pub async fn get_bucket_policy(&self, target: &BucketRef) -> Result<ResponseBody, StorageError> {
        tracing::debug!("Getting policy for bucket: {}", target.bucket_name);
        let url = self.subresource_url(&target.bucket_name, "policy")?;
        self.send(SignableRequest::new(Method::GET, url), Timeout::Control)
            .await
    }

    pub async fn set_bucket_policy(
        &self,
        request: &SetBucketPolicyRequest,
    ) -> Result<ResponseBody, StorageError> {
        tracing::debug!("Setting policy for bucket: {}", request.bucket_name);
        let url = self.subresource_url(&request.bucket_name, "policy")?;
        let signable = SignableRequest::new(Method::PUT, url)
            .with_header("content-type", "application/json")
            .with_payload(request.policy_body()?);

        let body = self.send(signable, Timeout::Control).await?;
        tracing::info!("Updated policy for bucket: {}", request.bucket_name);
        Ok(body)
    }

    pub async fn get_bucket_versioning(
        &self,
        target: &BucketRef,
    ) -> Result<ResponseBody, StorageError> {
        tracing::debug!("Getting versioning for bucket: {}", target.bucket_name);
        let url = self.subresource_url(&target.bucket_name, "versioning")?;
        self.send(SignableRequest::new(Method::GET, url), Timeout::Control)
            .await
    }

    pub async fn set_bucket_versioning(
        &self,
        request: &SetBucketVersioningRequest,
    ) -> Result<ResponseBody, StorageError> {
        tracing::debug!(
            "Setting versioning for bucket {} to {}",
            request.bucket_name,
            request.status
        );
        let url = self.subresource_url(&request.bucket_name, "versioning")?;

        let document = to_xml_string(&VersioningConfiguration {
            xmlns: S3_XML_NAMESPACE,
            status: request.status.to_string(),
        })
        .map_err(|e| StorageError::InvalidRequest(format!("failed to serialize XML: {}", e)))?;

        let signable = SignableRequest::new(Method::PUT, url)
            .with_header("content-type", "application/xml")
            .with_payload(Bytes::from(document));

        let body = self.send(signable, Timeout::Control).await?;
        tracing::info!(
            "Versioning for bucket {} set to {}",
            request.bucket_name,
            request.status
        );
        Ok(body)
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Client {
    async fn list_buckets(&self) -> Result<Vec<String>, StorageError> {
        tracing::debug!("Listing buckets at {}", self.endpoint);

        let mut url = self.endpoint.clone();
        url.set_query(None);
        let xml = self.fetch_xml(SignableRequest::new(Method::GET, url)).await?;
        let names = parse_bucket_names(&xml)?;

        tracing::debug!("Found {} buckets", names.len());
        Ok(names)
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        query: &ListObjectsQuery,
    ) -> Result<ListingPage, StorageError> {
        tracing::debug!(
            "Listing objects in {} (prefix: {:?}, continuation: {})",
            bucket,
            query.prefix,
            query.continuation_token.is_some()
        );

        let mut url = self.bucket_url(bucket, None)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("list-type", "2");
            pairs.append_pair("max-keys", &query.max_keys.to_string());
            if let Some(prefix) = &query.prefix {
                pairs.append_pair("prefix", prefix);
            }
            if let Some(token) = &query.continuation_token {
                pairs.append_pair("continuation-token", token);
            }
        }

        let xml = self.fetch_xml(SignableRequest::new(Method::GET, url)).await?;
        let page = parse_listing(&xml)?;

        tracing::debug!(
            "Page for {} has {} entries (truncated: {})",
            bucket,
            page.entries.len(),
            page.is_truncated
        );
        Ok(page)
    }

    async fn upload_object(&self, request: &UploadRequest) -> Result<UploadReceipt, StorageError> {
        let content = request.decode_content()?;
        let size = content.len() as u64;
        tracing::debug!(
            "Uploading {}/{} ({} bytes)",
            request.bucket_name,
            request.object_key,
            size
        );

        let url = self.bucket_url(&request.bucket_name, Some(&request.object_key))?;
        let signable = SignableRequest::new(Method::PUT, url)
            .with_header("content-type", request.content_type())
            .with_payload(content);

        let response = self.send_raw(signable, Timeout::Transfer).await?;
        tracing::info!(
            "Successfully stored object: {}/{}",
            request.bucket_name,
            request.object_key
        );

        Ok(UploadReceipt {
            bucket: request.bucket_name.clone(),
            key: request.object_key.clone(),
            size,
            status: response.status.as_u16(),
            etag: response.header("etag").map(str::to_string),
        })
    }

    async fn download_object(&self, target: &ObjectRef) -> Result<DownloadedObject, StorageError> {
        tracing::debug!("Downloading {}/{}", target.bucket_name, target.object_key);

        let url = self.bucket_url(&target.bucket_name, Some(&target.object_key))?;
        let response = self
            .send_raw(SignableRequest::new(Method::GET, url), Timeout::Transfer)
            .await?;

        Ok(DownloadedObject {
            bucket: target.bucket_name.clone(),
            key: target.object_key.clone(),
            content_type: response.content_type().to_string(),
            size: response.body.len() as u64,
            content_base64: BASE64.encode(&response.body),
        })
    }

    async fn delete_object(&self, target: &ObjectRef) -> Result<DeleteReceipt, StorageError> {
        tracing::debug!("Deleting {}/{}", target.bucket_name, target.object_key);

        let url = self.bucket_url(&target.bucket_name, Some(&target.object_key))?;
        let response = self
            .send_raw(SignableRequest::new(Method::DELETE, url), Timeout::Control)
            .await?;

        tracing::info!(
            "Successfully deleted object: {}/{}",
            target.bucket_name,
            target.object_key
        );
        Ok(DeleteReceipt {
            bucket: target.bucket_name.clone(),
            key: target.object_key.clone(),
            status: response.status.as_u16(),
        })
    }
}
