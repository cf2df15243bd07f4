//! Remote analysis client: submit an image, get back a job handle.
//!
//! The analyze call is asynchronous on the service side: a successful POST
//! answers `202 Accepted` with an `Operation-Location` header pointing at
//! the job, and the result is fetched later by [`crate::pipeline::poll`].
//! Submission is a single request; nothing here retries.

use crate::config::{ScanConfig, UploadMode};
use crate::error::CardScanError;
use crate::pipeline::capture::CapturedImage;
use crate::pipeline::transport::{
    AnalysisTransport, ReqwestTransport, UploadBody, OPERATION_LOCATION_HEADER,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Opaque URI of an in-progress analysis job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisJobHandle(String);

impl AnalysisJobHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnalysisJobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client for the document-analysis service.
///
/// Cheap to clone; all clones share one transport.
#[derive(Clone)]
pub struct AnalysisClient {
    config: ScanConfig,
    transport: Arc<dyn AnalysisTransport>,
}

impl fmt::Debug for AnalysisClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisClient")
            .field("config", &self.config)
            .field("transport", &"<dyn AnalysisTransport>")
            .finish()
    }
}

impl AnalysisClient {
    /// Build a client talking HTTP with the configured request timeout.
    pub fn new(config: ScanConfig) -> Result<Self, CardScanError> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build a client over a caller-supplied transport.
    pub fn with_transport(config: ScanConfig, transport: Arc<dyn AnalysisTransport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> &dyn AnalysisTransport {
        self.transport.as_ref()
    }

    /// Upload `image` and return the handle of the analysis job.
    ///
    /// # Errors
    /// - [`CardScanError::RemoteService`] on a non-2xx status, with the body text
    /// - [`CardScanError::Protocol`] when the `Operation-Location` header is absent
    /// - [`CardScanError::Http`] on connection-level failure
    pub async fn submit(&self, image: CapturedImage) -> Result<AnalysisJobHandle, CardScanError> {
        let url = self.config.analyze_url();
        let body = match self.config.upload_mode {
            UploadMode::OctetStream => UploadBody::OctetStream(image.bytes),
            UploadMode::Multipart => UploadBody::Multipart {
                file_name: image.file_name().to_string(),
                mime_type: image.mime_type.to_string(),
                bytes: image.bytes,
            },
        };

        info!(
            "Submitting {} byte image to model '{}'",
            body.len(),
            self.config.model_id
        );

        let reply = self
            .transport
            .post_document(&url, &self.config.api_key, body)
            .await?;

        if !reply.is_success() {
            return Err(CardScanError::RemoteService {
                status: reply.status,
                body: reply.body_text(),
            });
        }

        let location = reply
            .header(OPERATION_LOCATION_HEADER)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CardScanError::Protocol("operation location missing".into()))?;

        debug!("Analysis job accepted (HTTP {}): {}", reply.status, location);
        Ok(AnalysisJobHandle::new(location))
    }
}
