use super::credentials::Credentials;
use crate::types::StorageError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::Method;
use url::Url;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const REGION: &str = "us-east-1";
pub const SERVICE: &str = "s3";
pub const TERMINATOR: &str = "aws4_request";
pub const SIGNED_HEADERS: &str = "host;x-amz-content-sha256;x-amz-date";

const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const DATE_STAMP_FORMAT: &str = "%Y%m%d";

/// Everything the signer needs to know about an outgoing request
#[derive(Debug, Clone)]
pub struct SignableRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub payload: Bytes,
}

impl SignableRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            payload: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_payload(mut self, payload: Bytes) -> Self {
        self.payload = payload;
        self
    }
}

/// Authentication headers computed for one request attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub content_sha256: String,
    pub host: String,
}

impl AuthHeaders {
    /// Header name/value pairs as they go on the wire
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("authorization", self.authorization.as_str()),
            ("x-amz-date", self.amz_date.as_str()),
            ("x-amz-content-sha256", self.content_sha256.as_str()),
            ("host", self.host.as_str()),
        ]
        .into_iter()
    }
}

/// A request ready for the executor, with or without authentication
///
/// The auth headers are bound to the timestamp they were computed for, so a
/// retry has to go through `prepare` again rather than reuse this value.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub request: SignableRequest,
    pub auth: Option<AuthHeaders>,
}

impl SignedRequest {
    pub fn unsigned(request: SignableRequest) -> Self {
        Self {
            request,
            auth: None,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.auth.is_some()
    }
}

/// Sign the request when credentials are available, otherwise pass it through unsigned
pub fn prepare(
    credentials: &Credentials,
    request: SignableRequest,
    now: DateTime<Utc>,
) -> Result<SignedRequest, StorageError> {
    match sign(credentials, &request, now) {
        Ok(auth) => Ok(SignedRequest {
            request,
            auth: Some(auth),
        }),
        Err(StorageError::Configuration(reason)) => {
            tracing::debug!("Sending unauthenticated request: {}", reason);
            Ok(SignedRequest::unsigned(request))
        }
        Err(e) => Err(e),
    }
}

/// Compute AWS Signature V4 headers for a request
///
/// Only `host`, `x-amz-content-sha256` and `x-amz-date` are signed, and the
/// canonical query string is always empty. Region and service are fixed to
/// `us-east-1` / `s3`.
///
/// Returns a Configuration error when either credential component is missing.
pub fn sign(
    credentials: &Credentials,
    request: &SignableRequest,
    now: DateTime<Utc>,
) -> Result<AuthHeaders, StorageError> {
    if !credentials.is_complete() {
        return Err(StorageError::Configuration(
            "object storage access key or secret key is not set".to_string(),
        ));
    }

    let host = host_header(&request.url).ok_or_else(|| {
        StorageError::InvalidRequest(format!("URL has no host: {}", request.url))
    })?;

    let amz_date = now.format(AMZ_DATE_FORMAT).to_string();
    let date_stamp = now.format(DATE_STAMP_FORMAT).to_string();
    let content_sha256 = payload_hash(&request.payload);

    let canonical_request = build_canonical_request(
        request.method.as_str(),
        &canonical_uri(request.url.path()),
        &host,
        &content_sha256,
        &amz_date,
    );

    let credential_scope = credential_scope(&date_stamp);
    let string_to_sign = build_string_to_sign(&canonical_request, &amz_date, &credential_scope);
    let signature =
        calculate_signature(&credentials.secret_access_key, &date_stamp, &string_to_sign)?;

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, credentials.access_key_id, credential_scope, SIGNED_HEADERS, signature
    );

    Ok(AuthHeaders {
        authorization,
        amz_date,
        content_sha256,
        host,
    })
}

/// Hex SHA-256 of the request body
pub fn payload_hash(payload: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    hex::encode(Sha256::digest(payload))
}

/// Host header value: host plus explicit non-default port
pub fn host_header(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// S3 URI encoding of one path segment
///
/// Every byte except `A-Za-z0-9-_.~` is percent-encoded, `/` included.
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Canonical URI as S3 rebuilds it: each segment decoded once, then re-encoded
fn canonical_uri(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let decoded = urlencoding::decode_binary(segment.as_bytes());
            urlencoding::encode_binary(&decoded).into_owned()
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn credential_scope(date_stamp: &str) -> String {
    format!("{}/{}/{}/{}", date_stamp, REGION, SERVICE, TERMINATOR)
}

/// Build the canonical request string
pub(crate) fn build_canonical_request(
    method: &str,
    path: &str,
    host: &str,
    content_sha256: &str,
    amz_date: &str,
) -> String {
    let path = if path.is_empty() { "/" } else { path };

    let canonical_headers = format!(
        "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
        host, content_sha256, amz_date
    );

    // HTTPMethod \n CanonicalURI \n CanonicalQueryString \n
    // CanonicalHeaders \n SignedHeaders \n HashedPayload
    format!(
        "{}\n{}\n\n{}\n{}\n{}",
        method.to_ascii_uppercase(),
        path,
        canonical_headers,
        SIGNED_HEADERS,
        content_sha256
    )
}

/// Build the string to sign
pub(crate) fn build_string_to_sign(
    canonical_request: &str,
    amz_date: &str,
    credential_scope: &str,
) -> String {
    use sha2::{Digest, Sha256};

    let hashed_canonical_request = hex::encode(Sha256::digest(canonical_request.as_bytes()));

    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM, amz_date, credential_scope, hashed_canonical_request
    )
}

/// Derive the signing key for a date
pub(crate) fn signing_key(secret_key: &str, date_stamp: &str) -> Result<Vec<u8>, StorageError> {
    let k_secret = format!("AWS4{}", secret_key);
    let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, REGION.as_bytes())?;
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes())?;
    hmac_sha256(&k_service, TERMINATOR.as_bytes())
}

/// Calculate the signature
fn calculate_signature(
    secret_key: &str,
    date_stamp: &str,
    string_to_sign: &str,
) -> Result<String, StorageError> {
    let k_signing = signing_key(secret_key, date_stamp)?;
    let signature = hmac_sha256(&k_signing, string_to_sign.as_bytes())?;

    Ok(hex::encode(signature))
}

/// HMAC-SHA256 helper
fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, StorageError> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| StorageError::Configuration(format!("HMAC error: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
