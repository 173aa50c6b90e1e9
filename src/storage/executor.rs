use crate::auth::SignedRequest;
use crate::types::StorageError;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Method, StatusCode};
use std::time::Duration;
use tracing::Instrument;

pub const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(60);

/// Which timeout budget a call runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Metadata and control calls
    Control,
    /// Object payload upload/download
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub control: Duration,
    pub transfer: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            control: DEFAULT_CONTROL_TIMEOUT,
            transfer: DEFAULT_TRANSFER_TIMEOUT,
        }
    }
}

impl Timeouts {
    fn budget(&self, timeout: Timeout) -> Duration {
        match timeout {
            Timeout::Control => self.control,
            Timeout::Transfer => self.transfer,
        }
    }
}

/// Successful response, before any body classification
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> &str {
        self.header(CONTENT_TYPE.as_str()).unwrap_or("")
    }
}

/// Response body classified by its declared media type
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Xml(String),
    Raw {
        status: u16,
        content_type: String,
        body: Bytes,
    },
}

impl ResponseBody {
    /// JSON rendering handed back to callers
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ResponseBody::Json(value) => value.clone(),
            ResponseBody::Xml(text) => serde_json::json!({ "xml_content": text }),
            ResponseBody::Raw {
                status,
                content_type,
                body,
            } => serde_json::json!({
                "status_code": status,
                "content_type": content_type,
                "content": String::from_utf8_lossy(body),
            }),
        }
    }
}

/// Classify a response body by its `Content-Type`
pub fn classify(response: RawResponse) -> Result<ResponseBody, StorageError> {
    let content_type = response.content_type().to_ascii_lowercase();

    if content_type.contains("application/json") {
        return serde_json::from_slice(&response.body)
            .map(ResponseBody::Json)
            .map_err(|e| {
                StorageError::parse(
                    format!("invalid JSON body: {}", e),
                    String::from_utf8_lossy(&response.body),
                )
            });
    }

    if content_type.contains("application/xml") || content_type.contains("text/xml") {
        return Ok(ResponseBody::Xml(
            String::from_utf8_lossy(&response.body).into_owned(),
        ));
    }

    Ok(ResponseBody::Raw {
        status: response.status.as_u16(),
        content_type,
        body: response.body,
    })
}

/// Issues single HTTP calls; never retries and never re-signs
#[derive(Debug, Clone)]
pub struct Executor {
    client: Client,
    timeouts: Timeouts,
}

impl Executor {
    pub fn new(timeouts: Timeouts) -> Result<Self, StorageError> {
        let client = Client::builder()
            .connect_timeout(timeouts.control)
            .build()
            .map_err(|e| StorageError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeouts })
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Issue one call and classify the body
    pub async fn execute(
        &self,
        signed: SignedRequest,
        timeout: Timeout,
    ) -> Result<ResponseBody, StorageError> {
        classify(self.execute_raw(signed, timeout).await?)
    }

    /// Issue one call and return the body untouched
    ///
    /// Non-success statuses become `StorageError::Status` with the body kept
    /// as text; connect failures and timeouts become `StorageError::Transport`.
    pub async fn execute_raw(
        &self,
        signed: SignedRequest,
        timeout: Timeout,
    ) -> Result<RawResponse, StorageError> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::debug_span!(
            "s3_request",
            %request_id,
            method = %signed.request.method,
            path = %signed.request.url.path(),
        );

        async move {
            let SignedRequest { request, auth } = signed;
            let has_body = !request.payload.is_empty()
                || request.method == Method::PUT
                || request.method == Method::POST;

            let mut builder = self
                .client
                .request(request.method, request.url)
                .timeout(self.timeouts.budget(timeout));

            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(auth) = &auth {
                for (name, value) in auth.iter() {
                    builder = builder.header(name, value);
                }
            }
            if has_body {
                builder = builder.body(request.payload);
            }

            tracing::debug!(signed = auth.is_some(), "Sending request");
            let response = builder.send().await.map_err(|e| {
                tracing::warn!("Request failed before a response arrived: {}", e);
                StorageError::from(e)
            })?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;

            if !status.is_success() {
                tracing::warn!("Endpoint returned HTTP {}", status.as_u16());
                return Err(StorageError::Status {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&body).into_owned(),
                });
            }

            tracing::debug!(status = status.as_u16(), bytes = body.len(), "Response received");
            Ok(RawResponse {
                status,
                headers,
                body,
            })
        }
        .instrument(span)
        .await
    }
}
