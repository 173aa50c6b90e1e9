mod helpers;

use helpers::{S3_NS, TestEndpoint, buckets_xml, listing_xml, query_value, xml};
use s3census::{Aggregator, ErrorKind, InMemoryStore, ObjectStore};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, Request, ResponseTemplate};

/// Two pages for `docs`: a(10) b(20) then c(30)
fn paged_docs(req: &Request) -> ResponseTemplate {
    match query_value(req, "continuation-token").as_deref() {
        None => xml(listing_xml(
            Some(S3_NS),
            &[("a", 10), ("b", 20)],
            true,
            Some("T1"),
        )),
        Some("T1") => xml(listing_xml(Some(S3_NS), &[("c", 30)], false, None)),
        Some(_) => ResponseTemplate::new(400),
    }
}

#[tokio::test]
async fn test_scan_follows_continuation_tokens() {
    let endpoint = TestEndpoint::start().await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(paged_docs)
        .mount(&endpoint.server)
        .await;

    let store: Arc<dyn ObjectStore> = Arc::new(endpoint.client);
    let stats = Aggregator::new(store)
        .with_page_size(2)
        .scan_bucket("docs")
        .await
        .unwrap();

    assert_eq!(stats.objects, 3);
    assert_eq!(stats.bytes, 60);
    assert_eq!(stats.size, "60 bytes");

    let requests = endpoint.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(query_value(&requests[0], "continuation-token").is_none());
    assert_eq!(
        query_value(&requests[1], "continuation-token").as_deref(),
        Some("T1")
    );
    assert!(
        requests
            .iter()
            .all(|r| query_value(r, "max-keys").as_deref() == Some("2"))
    );
}

#[tokio::test]
async fn test_malformed_bucket_fails_alone() {
    let endpoint = TestEndpoint::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(xml(buckets_xml(&["docs", "broken", "media"])))
        .mount(&endpoint.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(paged_docs)
        .mount(&endpoint.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(xml("<ListBucketResult><Contents><Key>x</Key></Contents>"))
        .mount(&endpoint.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media"))
        .respond_with(xml(listing_xml(None, &[("clip.mp4", 2048)], false, None)))
        .mount(&endpoint.server)
        .await;

    let result = Aggregator::new(Arc::new(endpoint.client))
        .aggregate_all()
        .await
        .unwrap();

    let scanned: Vec<&str> = result.buckets.iter().map(|b| b.bucket.as_str()).collect();
    assert_eq!(scanned, vec!["docs", "media"]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].bucket, "broken");
    assert_eq!(result.failed[0].error.kind, ErrorKind::Parse);
    assert_eq!(result.total_objects, 4);
    assert_eq!(result.total_bytes, 2108);
    assert_eq!(result.total_size, "2.06 KB");
}

#[tokio::test]
async fn test_denied_bucket_reports_status() {
    let endpoint = TestEndpoint::start().await;
    Mock::given(method("GET"))
        .and(path("/locked"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_string("<Error><Code>AccessDenied</Code></Error>"),
        )
        .mount(&endpoint.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(paged_docs)
        .mount(&endpoint.server)
        .await;

    let names = vec!["locked".to_string(), "docs".to_string()];
    let result = Aggregator::new(Arc::new(endpoint.client))
        .with_concurrency(1)
        .aggregate(&names)
        .await;

    assert_eq!(result.buckets.len(), 1);
    assert_eq!(result.failed[0].bucket, "locked");
    assert_eq!(result.failed[0].error.status, Some(403));
    assert_eq!(
        result.failed[0].error.raw.as_deref(),
        Some("<Error><Code>AccessDenied</Code></Error>")
    );
    assert_eq!(result.total_bytes, 60);
}

async fn seeded_store(count: usize, namespaced: bool) -> InMemoryStore {
    let store = if namespaced {
        InMemoryStore::new()
    } else {
        InMemoryStore::new().without_namespace()
    };
    store.create_bucket("bulk").await;
    for i in 0..count {
        store
            .insert("bulk", &format!("obj-{:04}", i), vec![0u8; i % 7 + 1])
            .await;
    }
    store
}

#[tokio::test]
async fn test_page_size_does_not_change_totals() {
    for count in [0usize, 1, 5, 12] {
        for namespaced in [true, false] {
            let store = Arc::new(seeded_store(count, namespaced).await);
            let expected_bytes: u64 = (0..count).map(|i| (i % 7 + 1) as u64).sum();

            for page_size in 1..=(count as u32 + 1) {
                let stats = Aggregator::new(store.clone())
                    .with_page_size(page_size)
                    .scan_bucket("bulk")
                    .await
                    .unwrap();
                assert_eq!(
                    stats.objects, count as u64,
                    "count={} page_size={}",
                    count, page_size
                );
                assert_eq!(stats.bytes, expected_bytes);
            }
        }
    }
}

#[tokio::test]
async fn test_prefix_limits_scan() {
    let store = InMemoryStore::new();
    store.insert("logs", "2024/01/a.log", vec![0u8; 100]).await;
    store.insert("logs", "2024/02/b.log", vec![0u8; 200]).await;
    store.insert("logs", "2025/01/c.log", vec![0u8; 400]).await;

    let stats = Aggregator::new(Arc::new(store))
        .with_page_size(1)
        .with_prefix(Some("2024/".to_string()))
        .scan_bucket("logs")
        .await
        .unwrap();
    assert_eq!(stats.objects, 2);
    assert_eq!(stats.bytes, 300);
}

#[tokio::test]
async fn test_missing_bucket_in_memory() {
    let store = InMemoryStore::new();
    store.insert("present", "k", vec![1u8, 2, 3]).await;

    let names = vec!["present".to_string(), "absent".to_string()];
    let result = Aggregator::new(Arc::new(store)).aggregate(&names).await;

    assert_eq!(result.buckets.len(), 1);
    assert_eq!(result.failed[0].bucket, "absent");
    assert_eq!(result.failed[0].error.status, Some(404));
    assert_eq!(result.total_size, "3 bytes");
}
