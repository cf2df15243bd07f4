//! HTTP seam between the analysis client and the network.
//!
//! [`AnalysisTransport`] is the narrow interface the submit and poll stages
//! need: one POST carrying the image, and GETs against the job handle. The
//! production implementation wraps a single `reqwest::Client`; tests supply
//! scripted replies and count requests.

use crate::error::CardScanError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::collections::HashMap;
use std::time::Duration;

/// Header carrying the subscription key on every request.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Response header that carries the job handle.
pub const OPERATION_LOCATION_HEADER: &str = "Operation-Location";

/// The body of an analyze request.
#[derive(Debug, Clone)]
pub enum UploadBody {
    /// Raw bytes sent as `application/octet-stream`.
    OctetStream(Vec<u8>),
    /// A multipart form with the image in a `file` field.
    Multipart {
        bytes: Vec<u8>,
        mime_type: String,
        file_name: String,
    },
}

impl UploadBody {
    pub fn len(&self) -> usize {
        match self {
            UploadBody::OctetStream(b) => b.len(),
            UploadBody::Multipart { bytes, .. } => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A buffered HTTP response.
#[derive(Debug, Clone, Default)]
pub struct HttpReply {
    pub status: u16,
    /// Header names are stored lower-cased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The requests the analysis pipeline issues.
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    /// POST the image to the analyze URL.
    async fn post_document(
        &self,
        url: &str,
        api_key: &str,
        body: UploadBody,
    ) -> Result<HttpReply, CardScanError>;

    /// GET the job handle.
    async fn get(&self, url: &str, api_key: &str) -> Result<HttpReply, CardScanError>;
}

/// [`AnalysisTransport`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, CardScanError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cardscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CardScanError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn collect(url: &str, response: reqwest::Response) -> Result<HttpReply, CardScanError> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| http_error(url, e))?
            .to_vec();
        Ok(HttpReply {
            status,
            headers,
            body,
        })
    }
}

fn http_error(url: &str, e: reqwest::Error) -> CardScanError {
    CardScanError::Http {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl AnalysisTransport for ReqwestTransport {
    async fn post_document(
        &self,
        url: &str,
        api_key: &str,
        body: UploadBody,
    ) -> Result<HttpReply, CardScanError> {
        let request = self
            .client
            .post(url)
            .header(SUBSCRIPTION_KEY_HEADER, api_key);

        let request = match body {
            UploadBody::OctetStream(bytes) => request
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(bytes),
            UploadBody::Multipart {
                bytes,
                mime_type,
                file_name,
            } => {
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&mime_type)
                    .map_err(|e| http_error(url, e))?;
                request.multipart(Form::new().part("file", part))
            }
        };

        let response = request.send().await.map_err(|e| http_error(url, e))?;
        Self::collect(url, response).await
    }

    async fn get(&self, url: &str, api_key: &str) -> Result<HttpReply, CardScanError> {
        let response = self
            .client
            .get(url)
            .header(SUBSCRIPTION_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(|e| http_error(url, e))?;
        Self::collect(url, response).await
    }
}
