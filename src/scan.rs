//! Pipeline orchestrator: image in, contact record out.
//!
//! [`Scanner::extract_contact_from_image`] is the entry point a UI layer
//! calls. It runs compress → submit → poll → normalize → cleanup strictly
//! in sequence, creates exactly one remote job per call, and never returns
//! an error: any stage failure is logged once, reported once through
//! [`ScanProgressCallback::on_scan_error`](crate::progress::ScanProgressCallback::on_scan_error),
//! and turned into an all-empty [`ContactInfo`].
//!
//! [`Scanner::try_extract`] runs the same pipeline but hands the error (or a
//! detailed [`ScanReport`]) back to the caller.
//!
//! ## Cancellation
//!
//! A scanner owns a [`CancellationToken`] that both the poll loop and camera
//! sessions observe. [`Scanner::cancel`] releases the camera and abandons
//! in-flight polling; the token stays cancelled, so later scans on the same
//! scanner fail fast with [`CardScanError::Cancelled`].

use crate::config::ScanConfig;
use crate::error::CardScanError;
use crate::output::{ContactInfo, ScanReport};
use crate::pipeline::analyze::AnalysisClient;
use crate::pipeline::camera::{capture_once, CameraDevice};
use crate::pipeline::capture::CapturedImage;
use crate::pipeline::transport::AnalysisTransport;
use crate::pipeline::{cleanup, compress, input, normalize, poll};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Runs business-card scans against one analysis service.
#[derive(Debug, Clone)]
pub struct Scanner {
    client: AnalysisClient,
    cancel: CancellationToken,
}

impl Scanner {
    /// Create a scanner that talks to the service over HTTP.
    pub fn new(config: ScanConfig) -> Result<Self, CardScanError> {
        Ok(Self {
            client: AnalysisClient::new(config)?,
            cancel: CancellationToken::new(),
        })
    }

    /// Create a scanner over a caller-supplied transport.
    pub fn with_transport(config: ScanConfig, transport: Arc<dyn AnalysisTransport>) -> Self {
        Self {
            client: AnalysisClient::with_transport(config, transport),
            cancel: CancellationToken::new(),
        }
    }

    /// Tie this scanner to an externally owned token (e.g. a view's lifetime).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        self.client.config()
    }

    /// A clone of the token this scanner observes.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Abandon in-flight work and release any camera this scanner holds.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    // ── Acquisition ──────────────────────────────────────────────────────

    /// Grab one frame from `device`, releasing it on every exit path.
    pub async fn capture_from_camera(
        &self,
        device: &dyn CameraDevice,
    ) -> Result<CapturedImage, CardScanError> {
        capture_once(
            device,
            self.config().camera_facing,
            self.config().capture_quality,
            self.cancel.clone(),
        )
        .await
    }

    /// Load an image from a local path or an HTTP(S) URL.
    pub async fn load_image(&self, source: &str) -> Result<CapturedImage, CardScanError> {
        input::resolve_input(source, self.config().download_timeout_secs).await
    }

    /// Acquire the card image from `camera`, falling back to `input`.
    ///
    /// A camera error (denied, missing, busy, failed grab) is not fatal when
    /// an `input` path or URL is also given: it is logged and the input is
    /// loaded instead. Without an input the camera error is returned.
    /// Cancellation is never treated as a camera error.
    pub async fn acquire(
        &self,
        camera: Option<&dyn CameraDevice>,
        input: Option<&str>,
    ) -> Result<CapturedImage, CardScanError> {
        if let Some(device) = camera {
            match self.capture_from_camera(device).await {
                Ok(image) => return Ok(image),
                Err(e) if e.is_camera_error() && input.is_some() => {
                    warn!("Camera {} failed, using the supplied image: {}", device.name(), e);
                }
                Err(e) => return Err(e),
            }
        }

        match input {
            Some(source) => self.load_image(source).await,
            None => Err(CardScanError::InvalidConfig(
                "no image given: supply a camera or an image path/URL".into(),
            )),
        }
    }

    // ── Extraction ───────────────────────────────────────────────────────

    /// Extract a contact from `image`; failures become an empty record.
    pub async fn extract_contact_from_image(&self, image: CapturedImage) -> ContactInfo {
        match self.try_extract(image).await {
            Ok(report) => report.contact,
            Err(e) => {
                self.report_failure(&e);
                ContactInfo::default()
            }
        }
    }

    /// Extract a contact from `image`, returning the error on failure.
    ///
    /// Unlike [`Scanner::extract_contact_from_image`] this does not notify
    /// the progress callback of errors; the caller owns the failure.
    pub async fn try_extract(&self, image: CapturedImage) -> Result<ScanReport, CardScanError> {
        let total_start = Instant::now();
        let config = self.client.config();

        if self.cancel.is_cancelled() {
            return Err(CardScanError::Cancelled);
        }

        // ── Step 1: Bound the upload size ────────────────────────────────
        let image =
            compress::compress_for_upload(image, config.max_image_edge, config.compress_quality)
                .await?;
        let upload_bytes = image.bytes.len();
        let upload_dimensions = (image.width, image.height);
        if let Some(ref cb) = config.progress_callback {
            cb.on_scan_start(upload_bytes);
        }

        // ── Step 2: Submit ───────────────────────────────────────────────
        let analysis_start = Instant::now();
        let handle = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(CardScanError::Cancelled),
            handle = self.client.submit(image) => handle?,
        };
        if let Some(ref cb) = config.progress_callback {
            cb.on_submitted(handle.as_str());
        }

        // ── Step 3: Poll ─────────────────────────────────────────────────
        let outcome = poll::poll(&self.client, &handle, &self.cancel).await?;
        let analysis_duration_ms = analysis_start.elapsed().as_millis() as u64;

        // ── Step 4: Normalize + clean ────────────────────────────────────
        let contact = cleanup::clean_contact(&normalize::normalize(&outcome.result));

        info!(
            "Scan complete: {}/7 fields after {} poll(s), {}ms",
            contact.filled_count(),
            outcome.attempts,
            total_start.elapsed().as_millis()
        );
        if let Some(ref cb) = config.progress_callback {
            cb.on_scan_complete(&contact);
        }

        Ok(ScanReport {
            contact,
            operation_location: handle.to_string(),
            poll_attempts: outcome.attempts,
            upload_bytes,
            upload_dimensions,
            analysis_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        })
    }

    /// The single place a failed scan is logged and surfaced.
    fn report_failure(&self, e: &CardScanError) {
        error!("Scan failed: {}", e);
        if let Some(ref cb) = self.client.config().progress_callback {
            cb.on_scan_error(e.user_message(), &e.to_string());
        }
    }
}

/// One-shot convenience: build a [`Scanner`] for `config` and scan `image`.
///
/// Configuration problems (e.g. the HTTP client cannot be built) are
/// reported like any other failure and yield an empty record.
pub async fn extract_contact_from_image(image: CapturedImage, config: &ScanConfig) -> ContactInfo {
    match Scanner::new(config.clone()) {
        Ok(scanner) => scanner.extract_contact_from_image(image).await,
        Err(e) => {
            error!("Scan failed: {}", e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_scan_error(e.user_message(), &e.to_string());
            }
            ContactInfo::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::camera::{CameraStream, Facing};
    use crate::pipeline::capture::ImageSource;
    use async_trait::async_trait;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A device that fails to open with a fixed error, or hands out
    /// streams that track how many are still held.
    struct StubCamera {
        open_error: Option<fn() -> CardScanError>,
        held: Arc<AtomicUsize>,
        facings: std::sync::Mutex<Vec<Facing>>,
    }

    impl StubCamera {
        fn failing(make: fn() -> CardScanError) -> Self {
            Self {
                open_error: Some(make),
                held: Arc::new(AtomicUsize::new(0)),
                facings: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn working() -> Self {
            Self {
                open_error: None,
                held: Arc::new(AtomicUsize::new(0)),
                facings: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    struct StubStream {
        held: Arc<AtomicUsize>,
        released: bool,
    }

    impl CameraDevice for StubCamera {
        fn name(&self) -> String {
            "stub0".into()
        }

        fn open(&self, facing: Facing) -> Result<Box<dyn CameraStream>, CardScanError> {
            self.facings.lock().unwrap().push(facing);
            if let Some(make) = self.open_error {
                return Err(make());
            }
            self.held.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StubStream {
                held: Arc::clone(&self.held),
                released: false,
            }))
        }
    }

    #[async_trait]
    impl CameraStream for StubStream {
        async fn grab_frame(&mut self) -> Result<DynamicImage, CardScanError> {
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(80, 50, Rgb([200, 200, 200]))))
        }

        fn release(&mut self) {
            if !self.released {
                self.released = true;
                self.held.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    fn scanner_with(facing: Facing) -> Scanner {
        let config = ScanConfig::builder()
            .endpoint("https://acme.cognitiveservices.azure.com")
            .api_key("test-key")
            .camera_facing(facing)
            .build()
            .unwrap();
        Scanner::new(config).unwrap()
    }

    fn card_file() -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(120, 70, Rgb([250, 250, 250])))
            .save(file.path())
            .unwrap();
        file
    }

    #[tokio::test]
    async fn denied_camera_falls_back_to_input() {
        let scanner = scanner_with(Facing::Environment);
        let cam = StubCamera::failing(|| CardScanError::PermissionDenied {
            device: "stub0".into(),
        });
        let file = card_file();
        let path = file.path().to_str().unwrap();

        let image = scanner.acquire(Some(&cam), Some(path)).await.unwrap();
        assert_eq!((image.width, image.height), (120, 70));
        assert!(matches!(image.source, ImageSource::Upload { .. }));
        assert_eq!(cam.held.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unavailable_camera_without_input_is_an_error() {
        let scanner = scanner_with(Facing::Environment);
        let cam = StubCamera::failing(|| CardScanError::CameraUnavailable {
            device: "stub0".into(),
        });
        let err = scanner.acquire(Some(&cam), None).await.unwrap_err();
        assert!(matches!(err, CardScanError::CameraUnavailable { .. }));
        assert_eq!(cam.held.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn working_camera_wins_over_input_and_is_released() {
        let scanner = scanner_with(Facing::User);
        let cam = StubCamera::working();
        let file = card_file();

        let image = scanner
            .acquire(Some(&cam), file.path().to_str())
            .await
            .unwrap();
        assert_eq!((image.width, image.height), (80, 50));
        assert!(matches!(image.source, ImageSource::Camera { .. }));
        assert_eq!(cam.held.load(Ordering::SeqCst), 0);
        assert_eq!(*cam.facings.lock().unwrap(), vec![Facing::User]);
    }

    #[tokio::test]
    async fn cancelled_scanner_does_not_fall_back() {
        let scanner = scanner_with(Facing::Environment);
        scanner.cancel();
        let cam = StubCamera::working();
        let file = card_file();

        let err = scanner
            .acquire(Some(&cam), file.path().to_str())
            .await
            .unwrap_err();
        assert!(matches!(err, CardScanError::Cancelled));
        assert_eq!(cam.held.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn nothing_to_acquire_is_rejected() {
        let scanner = scanner_with(Facing::Environment);
        let err = scanner.acquire(None, None).await.unwrap_err();
        assert!(matches!(err, CardScanError::InvalidConfig(_)));
    }
}
