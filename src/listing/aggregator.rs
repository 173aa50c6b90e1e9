use crate::storage::{DEFAULT_PAGE_SIZE, ObjectStore};
use crate::types::requests::{ListObjectsQuery, ScanRequest};
use crate::types::{AggregateResult, BucketFailure, BucketStats, StorageError, format_size};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

pub const DEFAULT_SCAN_CONCURRENCY: usize = 4;

/// Walks bucket listings page by page and totals object counts and sizes
///
/// Pages of one bucket are fetched strictly in sequence, each call carrying
/// the continuation token of the previous page. Separate buckets are scanned
/// concurrently up to `concurrency`; a bucket's stats are only produced once
/// its last page has been consumed.
#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn ObjectStore>,
    page_size: u32,
    concurrency: usize,
    prefix: Option<String>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_SCAN_CONCURRENCY,
            prefix: None,
        }
    }

    /// `max-keys` hint sent with every listing call
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Number of buckets scanned at once; 1 scans them one after another
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Only count keys under this prefix
    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self
    }

    /// Count every object in one bucket
    pub async fn scan_bucket(&self, bucket: &str) -> Result<BucketStats, StorageError> {
        let mut objects: u64 = 0;
        let mut bytes: u64 = 0;
        let mut pages: u64 = 0;
        let mut token: Option<String> = None;

        loop {
            let query = ListObjectsQuery::new(self.page_size)
                .with_prefix(self.prefix.clone())
                .with_continuation_token(token.take());

            let page = self.store.list_objects_page(bucket, &query).await?;
            pages += 1;

            for entry in &page.entries {
                objects += 1;
                bytes = bytes.saturating_add(entry.size);
            }

            match page.next_token() {
                Some(next) => token = Some(next.to_string()),
                None => {
                    if page.is_truncated {
                        tracing::warn!(
                            "Listing of {} is truncated but carries no continuation token, stopping after {} pages",
                            bucket,
                            pages
                        );
                    }
                    break;
                }
            }
        }

        tracing::info!(
            "Scanned bucket {}: {} objects, {} bytes in {} pages",
            bucket,
            objects,
            bytes,
            pages
        );

        Ok(BucketStats {
            bucket: bucket.to_string(),
            objects,
            bytes,
            size: format_size(bytes),
        })
    }

    /// Scan the given buckets and total them
    ///
    /// A bucket that fails is reported in `failed` and left out of the grand
    /// totals; the remaining buckets are still scanned. Both lists keep the
    /// order the names were given in.
    pub async fn aggregate(&self, bucket_names: &[String]) -> AggregateResult {
        let outcomes: Vec<(String, Result<BucketStats, StorageError>)> =
            stream::iter(bucket_names.iter().cloned())
                .map(|bucket| async move {
                    let outcome = self.scan_bucket(&bucket).await;
                    (bucket, outcome)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut result = AggregateResult {
            buckets: Vec::new(),
            failed: Vec::new(),
            total_objects: 0,
            total_bytes: 0,
            total_size: String::new(),
        };

        for (bucket, outcome) in outcomes {
            match outcome {
                Ok(stats) => {
                    result.total_objects += stats.objects;
                    result.total_bytes = result.total_bytes.saturating_add(stats.bytes);
                    result.buckets.push(stats);
                }
                Err(e) => {
                    tracing::error!("Failed to scan bucket {}: {}", bucket, e);
                    result.failed.push(BucketFailure {
                        bucket,
                        error: e.to_payload(),
                    });
                }
            }
        }
        result.total_size = format_size(result.total_bytes);

        result
    }

    /// List every bucket and scan all of them
    pub async fn aggregate_all(&self) -> Result<AggregateResult, StorageError> {
        let buckets = self.store.list_buckets().await?;
        tracing::info!("Scanning {} buckets", buckets.len());
        Ok(self.aggregate(&buckets).await)
    }

    /// Scan the named buckets, or every bucket when none are named
    pub async fn scan(&self, request: &ScanRequest) -> Result<AggregateResult, StorageError> {
        match request.bucket_names.as_deref() {
            Some(names) if !names.is_empty() => Ok(self.aggregate(names).await),
            _ => self.aggregate_all().await,
        }
    }
}
