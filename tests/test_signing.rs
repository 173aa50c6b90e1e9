mod helpers;

use bytes::Bytes;
use chrono::NaiveDateTime;
use helpers::{TEST_ACCESS_KEY_ID, TEST_SECRET_ACCESS_KEY, TestEndpoint, header_value, listing_xml, xml};
use reqwest::Method;
use s3census::types::requests::{ObjectRef, UploadRequest};
use s3census::{Credentials, ObjectStore, SignableRequest, sign};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

#[tokio::test]
async fn test_listing_request_is_signed() {
    let endpoint = TestEndpoint::start().await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(xml(listing_xml(None, &[], false, None)))
        .mount(&endpoint.server)
        .await;

    endpoint
        .client
        .list_objects_page(
            "docs",
            &s3census::types::requests::ListObjectsQuery::new(10)
                .with_prefix(Some("reports/".to_string())),
        )
        .await
        .unwrap();

    let requests = endpoint.requests().await;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    let authorization = header_value(request, "authorization").expect("authorization header");
    assert!(authorization.starts_with(&format!(
        "AWS4-HMAC-SHA256 Credential={}/",
        TEST_ACCESS_KEY_ID
    )));
    assert!(authorization.contains("/us-east-1/s3/aws4_request"));
    assert!(authorization.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date,"));
    assert_eq!(
        header_value(request, "x-amz-content-sha256").as_deref(),
        Some(EMPTY_SHA256)
    );

    assert_eq!(
        header_value(request, "host"),
        Some(endpoint.server.address().to_string())
    );

    // Recompute from what the server saw, at the same timestamp
    let amz_date = header_value(request, "x-amz-date").expect("x-amz-date header");
    let now = NaiveDateTime::parse_from_str(&amz_date, "%Y%m%dT%H%M%SZ")
        .unwrap()
        .and_utc();
    let expected = sign(
        &Credentials::new(TEST_ACCESS_KEY_ID, TEST_SECRET_ACCESS_KEY),
        &SignableRequest::new(Method::GET, endpoint.sent_url(request)),
        now,
    )
    .unwrap();
    assert_eq!(authorization, expected.authorization);
}

#[tokio::test]
async fn test_upload_signs_payload_hash() {
    let endpoint = TestEndpoint::start().await;
    Mock::given(method("PUT"))
        .and(path("/docs/notes/today.txt"))
        .respond_with(ResponseTemplate::new(200).insert_header("etag", "\"abc\""))
        .mount(&endpoint.server)
        .await;

    let content = b"hello world";
    endpoint
        .client
        .upload_object(&UploadRequest::from_bytes(
            "docs",
            "notes/today.txt",
            content,
            Some("text/plain".to_string()),
        ))
        .await
        .unwrap();

    let requests = endpoint.requests().await;
    let request = &requests[0];
    assert_eq!(request.body, content.to_vec());
    assert_eq!(
        header_value(request, "x-amz-content-sha256").as_deref(),
        Some("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
    );

    let amz_date = header_value(request, "x-amz-date").unwrap();
    let now = NaiveDateTime::parse_from_str(&amz_date, "%Y%m%dT%H%M%SZ")
        .unwrap()
        .and_utc();
    let expected = sign(
        &Credentials::new(TEST_ACCESS_KEY_ID, TEST_SECRET_ACCESS_KEY),
        &SignableRequest::new(Method::PUT, endpoint.sent_url(request))
            .with_payload(Bytes::from_static(content)),
        now,
    )
    .unwrap();
    assert_eq!(
        header_value(request, "authorization").as_deref(),
        Some(expected.authorization.as_str())
    );
}

#[tokio::test]
async fn test_missing_credentials_send_unsigned() {
    let endpoint = TestEndpoint::start_anonymous().await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(xml(listing_xml(None, &[("readme.md", 12)], false, None)))
        .mount(&endpoint.server)
        .await;

    let aggregator = s3census::Aggregator::new(std::sync::Arc::new(endpoint.client));
    let stats = aggregator.scan_bucket("public").await.unwrap();
    assert_eq!(stats.objects, 1);

    let requests = endpoint.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(header_value(&requests[0], "authorization").is_none());
    assert!(header_value(&requests[0], "x-amz-date").is_none());
}

#[tokio::test]
async fn test_reserved_characters_signed_as_sent() {
    let endpoint = TestEndpoint::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/a%2Bb%281%29%21.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
        .expect(1)
        .mount(&endpoint.server)
        .await;

    endpoint
        .client
        .download_object(&ObjectRef {
            bucket_name: "docs".to_string(),
            object_key: "a+b(1)!.txt".to_string(),
        })
        .await
        .unwrap();

    let requests = endpoint.requests().await;
    let request = &requests[0];
    assert_eq!(request.url.path(), "/docs/a%2Bb%281%29%21.txt");

    // Signing the literal key gives the same signature as the encoded path on the wire
    let amz_date = header_value(request, "x-amz-date").unwrap();
    let now = NaiveDateTime::parse_from_str(&amz_date, "%Y%m%dT%H%M%SZ")
        .unwrap()
        .and_utc();
    let mut literal = endpoint.sent_url(request);
    literal.set_path("/docs/a+b(1)!.txt");
    let expected = sign(
        &Credentials::new(TEST_ACCESS_KEY_ID, TEST_SECRET_ACCESS_KEY),
        &SignableRequest::new(Method::GET, literal),
        now,
    )
    .unwrap();
    assert_eq!(
        header_value(request, "authorization").as_deref(),
        Some(expected.authorization.as_str())
    );
}
