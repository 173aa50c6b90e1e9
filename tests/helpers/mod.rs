#![allow(dead_code)]

use s3census::{Credentials, S3Client, Timeouts};
use wiremock::{MockServer, ResponseTemplate};

pub const TEST_ACCESS_KEY_ID: &str = "test-access-key";
pub const TEST_SECRET_ACCESS_KEY: &str = "test-secret-key";
pub const TEST_BUCKET: &str = "test-bucket";

pub const S3_NS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Mock endpoint plus a signing client pointed at it
pub struct TestEndpoint {
    pub server: MockServer,
    pub client: S3Client,
}

impl TestEndpoint {
    pub async fn start() -> Self {
        Self::start_with(Credentials::new(TEST_ACCESS_KEY_ID, TEST_SECRET_ACCESS_KEY)).await
    }

    /// Client that has no credential pair and sends unsigned requests
    pub async fn start_anonymous() -> Self {
        Self::start_with(Credentials::default()).await
    }

    async fn start_with(credentials: Credentials) -> Self {
        let server = MockServer::start().await;
        let client = S3Client::new(&server.uri(), credentials, Timeouts::default())
            .expect("client for mock server");
        Self { server, client }
    }

    pub async fn requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// URL the client actually targeted
    ///
    /// The recorded request URL does not keep the listener's host and port,
    /// so rebuild it on top of the server address.
    pub fn sent_url(&self, request: &wiremock::Request) -> url::Url {
        let mut url = url::Url::parse(&self.server.uri()).expect("mock server uri");
        url.set_path(request.url.path());
        url.set_query(request.url.query());
        url
    }
}

pub fn xml(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "application/xml")
}

/// ListObjectsV2 document with the given entries
pub fn listing_xml(
    namespace: Option<&str>,
    entries: &[(&str, u64)],
    truncated: bool,
    token: Option<&str>,
) -> String {
    let mut doc = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    match namespace {
        Some(ns) => doc.push_str(&format!(r#"<ListBucketResult xmlns="{}">"#, ns)),
        None => doc.push_str("<ListBucketResult>"),
    }
    doc.push_str(&format!("<KeyCount>{}</KeyCount>", entries.len()));
    doc.push_str(&format!("<IsTruncated>{}</IsTruncated>", truncated));
    if let Some(token) = token {
        doc.push_str(&format!(
            "<NextContinuationToken>{}</NextContinuationToken>",
            token
        ));
    }
    for (key, size) in entries {
        doc.push_str(&format!(
            "<Contents><Key>{}</Key><LastModified>2024-01-01T00:00:00.000Z</LastModified><Size>{}</Size></Contents>",
            key, size
        ));
    }
    doc.push_str("</ListBucketResult>");
    doc
}

pub fn buckets_xml(names: &[&str]) -> String {
    let buckets: String = names
        .iter()
        .map(|name| format!("<Bucket><Name>{}</Name></Bucket>", name))
        .collect();
    format!(
        r#"<ListAllMyBucketsResult xmlns="{}"><Owner><ID>owner</ID></Owner><Buckets>{}</Buckets></ListAllMyBucketsResult>"#,
        S3_NS, buckets
    )
}

/// Value of a query parameter on a recorded request
pub fn query_value(request: &wiremock::Request, name: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

pub fn header_value(request: &wiremock::Request, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
