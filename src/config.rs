//! Configuration types for business-card scanning.
//!
//! All scanning behaviour is controlled through [`ScanConfig`], built via
//! its [`ScanConfigBuilder`]. The analysis client receives the config at
//! construction, so there are no process-wide constants for the endpoint,
//! key or model, and tests can point the pipeline at a fake service.

use crate::error::CardScanError;
use crate::pipeline::camera::Facing;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Vendor model used when none is configured.
pub const DEFAULT_MODEL_ID: &str = "prebuilt-businessCard";

/// API version the analyze and poll endpoints are called with.
pub const DEFAULT_API_VERSION: &str = "2023-07-31";

/// Environment variable holding the service endpoint.
pub const ENV_ENDPOINT: &str = "CARDSCAN_ENDPOINT";
/// Environment variable holding the subscription key.
pub const ENV_API_KEY: &str = "CARDSCAN_API_KEY";
/// Environment variable overriding the model id.
pub const ENV_MODEL: &str = "CARDSCAN_MODEL";

/// Configuration for a business-card scan.
///
/// Built via [`ScanConfig::builder()`]; `endpoint` and `api_key` have no
/// usable default and are checked by [`ScanConfigBuilder::build`].
///
/// # Example
/// ```rust
/// use cardscan::ScanConfig;
///
/// let config = ScanConfig::builder()
///     .endpoint("https://my-resource.cognitiveservices.azure.com")
///     .api_key("0123456789abcdef")
///     .max_poll_attempts(20)
///     .build()
///     .unwrap();
/// assert_eq!(config.model_id, "prebuilt-businessCard");
/// ```
#[derive(Clone)]
pub struct ScanConfig {
    /// Base URL of the document-analysis resource, without a trailing slash.
    pub endpoint: String,

    /// Subscription key sent as `Ocp-Apim-Subscription-Key`.
    pub api_key: String,

    /// Document model to analyse with. Default: `prebuilt-businessCard`.
    pub model_id: String,

    /// `api-version` query parameter. Default: `2023-07-31`.
    pub api_version: String,

    /// How the image body is sent. Default: [`UploadMode::OctetStream`].
    pub upload_mode: UploadMode,

    /// Fixed delay before every poll request, in milliseconds. Default: 1000.
    pub poll_interval_ms: u64,

    /// Maximum number of poll requests before giving up. Default: 30.
    ///
    /// With the default interval this bounds a scan to roughly half a minute,
    /// which is also what stops an orphaned remote job from being polled forever.
    pub max_poll_attempts: u32,

    /// Longest edge, in pixels, an uploaded image may have. Default: 1200.
    ///
    /// Business-card text stays legible well below this, and the smaller
    /// upload keeps the submit request fast on mobile connections.
    pub max_image_edge: u32,

    /// JPEG quality (1–100) for frames grabbed from the camera. Default: 70.
    pub capture_quality: u8,

    /// JPEG quality (1–100) used when a large image is downscaled. Default: 60.
    pub compress_quality: u8,

    /// Per-request timeout for submit and poll calls, in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Timeout for downloading an image given as a URL, in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Camera requested when capturing. Default: [`Facing::Environment`].
    pub camera_facing: Facing,

    /// Receives stage and error events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            upload_mode: UploadMode::default(),
            poll_interval_ms: 1000,
            max_poll_attempts: 30,
            max_image_edge: 1200,
            capture_quality: 70,
            compress_quality: 60,
            request_timeout_secs: 60,
            download_timeout_secs: 60,
            camera_facing: Facing::Environment,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("model_id", &self.model_id)
            .field("api_version", &self.api_version)
            .field("upload_mode", &self.upload_mode)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("max_image_edge", &self.max_image_edge)
            .field("capture_quality", &self.capture_quality)
            .field("compress_quality", &self.compress_quality)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("camera_facing", &self.camera_facing)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ScanProgressCallback>"),
            )
            .finish()
    }
}

fn redact(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let tail: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("***{tail}")
}

impl ScanConfig {
    /// Create a new builder for `ScanConfig`.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a configuration from `CARDSCAN_ENDPOINT`, `CARDSCAN_API_KEY`
    /// and (optionally) `CARDSCAN_MODEL`.
    pub fn from_env() -> Result<ScanConfig, CardScanError> {
        let endpoint = std::env::var(ENV_ENDPOINT).map_err(|_| {
            CardScanError::InvalidConfig(format!("{ENV_ENDPOINT} is not set"))
        })?;
        let api_key = std::env::var(ENV_API_KEY)
            .map_err(|_| CardScanError::InvalidConfig(format!("{ENV_API_KEY} is not set")))?;

        let mut builder = Self::builder().endpoint(endpoint).api_key(api_key);
        if let Ok(model) = std::env::var(ENV_MODEL) {
            if !model.is_empty() {
                builder = builder.model_id(model);
            }
        }
        builder.build()
    }

    /// The analyze URL for the configured endpoint and model.
    pub fn analyze_url(&self) -> String {
        format!(
            "{}/formrecognizer/documentModels/{}:analyze?api-version={}",
            self.endpoint, self.model_id, self.api_version
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Builder for [`ScanConfig`].
#[derive(Debug)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into().trim().to_string();
        self
    }

    pub fn model_id(mut self, model: impl Into<String>) -> Self {
        self.config.model_id = model.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    pub fn upload_mode(mut self, mode: UploadMode) -> Self {
        self.config.upload_mode = mode;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn max_poll_attempts(mut self, n: u32) -> Self {
        self.config.max_poll_attempts = n.max(1);
        self
    }

    pub fn max_image_edge(mut self, px: u32) -> Self {
        self.config.max_image_edge = px.max(64);
        self
    }

    pub fn capture_quality(mut self, q: u8) -> Self {
        self.config.capture_quality = q.clamp(1, 100);
        self
    }

    pub fn compress_quality(mut self, q: u8) -> Self {
        self.config.compress_quality = q.clamp(1, 100);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn camera_facing(mut self, facing: Facing) -> Self {
        self.config.camera_facing = facing;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScanConfig, CardScanError> {
        let c = &self.config;
        if !(c.endpoint.starts_with("https://") || c.endpoint.starts_with("http://")) {
            return Err(CardScanError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.api_key.is_empty() {
            return Err(CardScanError::InvalidConfig(
                "api key must not be empty".into(),
            ));
        }
        if c.model_id.trim().is_empty() {
            return Err(CardScanError::InvalidConfig(
                "model id must not be empty".into(),
            ));
        }
        if c.request_timeout_secs == 0 || c.download_timeout_secs == 0 {
            return Err(CardScanError::InvalidConfig(
                "timeouts must be at least one second".into(),
            ));
        }
        if c.max_poll_attempts == 0 {
            return Err(CardScanError::InvalidConfig(
                "max poll attempts must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// How the image is placed in the analyze request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UploadMode {
    /// Raw bytes with `Content-Type: application/octet-stream`. (default)
    #[default]
    OctetStream,
    /// A `multipart/form-data` body with the image in a `file` field.
    Multipart,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ScanConfigBuilder {
        ScanConfig::builder()
            .endpoint("https://example.cognitiveservices.azure.com/")
            .api_key("secret-key-1234")
    }

    #[test]
    fn defaults_match_service_contract() {
        let c = base().build().unwrap();
        assert_eq!(c.model_id, DEFAULT_MODEL_ID);
        assert_eq!(c.api_version, "2023-07-31");
        assert_eq!(c.max_poll_attempts, 30);
        assert_eq!(c.max_image_edge, 1200);
        assert_eq!(c.capture_quality, 70);
        assert_eq!(c.upload_mode, UploadMode::OctetStream);
    }

    #[test]
    fn analyze_url_strips_trailing_slash() {
        let c = base().build().unwrap();
        assert_eq!(
            c.analyze_url(),
            "https://example.cognitiveservices.azure.com/formrecognizer/documentModels/prebuilt-businessCard:analyze?api-version=2023-07-31"
        );
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = ScanConfig::builder()
            .endpoint("https://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, CardScanError::InvalidConfig(_)));
    }

    #[test]
    fn non_http_endpoint_is_rejected() {
        let err = ScanConfig::builder()
            .endpoint("example.com")
            .api_key("k")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn setters_clamp() {
        let c = base()
            .max_poll_attempts(0)
            .capture_quality(0)
            .compress_quality(255)
            .max_image_edge(3)
            .request_timeout_secs(0)
            .download_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(c.max_poll_attempts, 1);
        assert_eq!(c.capture_quality, 1);
        assert_eq!(c.compress_quality, 100);
        assert_eq!(c.max_image_edge, 64);
        assert_eq!(c.request_timeout_secs, 1);
        assert_eq!(c.download_timeout_secs, 1);
    }

    #[test]
    fn zero_timeout_set_directly_is_rejected() {
        let mut builder = base();
        builder.config.request_timeout_secs = 0;
        let err = builder.build().unwrap_err();
        assert!(err.to_string().contains("timeouts"));
    }

    #[test]
    fn debug_redacts_key() {
        let c = base().build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key-1234"));
        assert!(dbg.contains("***1234"));
        assert!(dbg.contains("download_timeout_secs: 60"));
        assert!(dbg.contains("camera_facing: Environment"));
    }
}
