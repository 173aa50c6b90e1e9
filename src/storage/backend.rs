use crate::types::requests::{ListObjectsQuery, ListObjectsRequest, ObjectRef, UploadRequest};
use crate::types::{
    DeleteReceipt, DownloadedObject, ListingPage, ObjectListing, StorageError, UploadReceipt,
};

/// Default `max-keys` when a caller does not pick one
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Object storage operations - implement this for different storage backends
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Names of every bucket visible to the credentials
    async fn list_buckets(&self) -> Result<Vec<String>, StorageError>;

    /// Fetch and decode one ListObjectsV2 page
    async fn list_objects_page(
        &self,
        bucket: &str,
        query: &ListObjectsQuery,
    ) -> Result<ListingPage, StorageError>;

    async fn upload_object(&self, request: &UploadRequest) -> Result<UploadReceipt, StorageError>;
    async fn download_object(&self, target: &ObjectRef) -> Result<DownloadedObject, StorageError>;
    async fn delete_object(&self, target: &ObjectRef) -> Result<DeleteReceipt, StorageError>;

    /// One listing page in caller-facing form
    async fn list_objects(
        &self,
        request: &ListObjectsRequest,
    ) -> Result<ObjectListing, StorageError> {
        let query = ListObjectsQuery::new(request.max_keys.unwrap_or(DEFAULT_PAGE_SIZE))
            .with_prefix(request.prefix.clone())
            .with_continuation_token(request.continuation_token.clone());

        let page = self.list_objects_page(&request.bucket_name, &query).await?;
        let next_continuation_token = page.next_token().map(str::to_string);

        Ok(ObjectListing {
            bucket: request.bucket_name.clone(),
            count: page.entries.len(),
            objects: page.entries,
            is_truncated: page.is_truncated,
            next_continuation_token,
        })
    }
}
