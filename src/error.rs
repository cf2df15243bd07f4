//! Error types for the cardscan library.
//!
//! Every pipeline stage returns [`CardScanError`] and propagates it with `?`.
//! Exactly one place turns an error into a user-facing outcome: the
//! orchestrator in [`crate::scan`], which logs it once, reports it once
//! through [`crate::progress::ScanProgressCallback::on_scan_error`] and
//! hands back an all-empty [`crate::output::ContactInfo`].
//!
//! Callers that prefer to handle failures themselves use
//! [`crate::scan::Scanner::try_extract`], which returns the error unchanged.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the cardscan pipeline.
#[derive(Debug, Error)]
pub enum CardScanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The file exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes do not decode as a supported raster image.
    #[error("Input is not a supported image ({origin}): {detail}")]
    NotAnImage { origin: String, detail: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Camera errors ─────────────────────────────────────────────────────
    /// The process is not allowed to open the camera device.
    #[error("Camera access denied for '{device}'\nCheck permissions or pass an image file instead.")]
    PermissionDenied { device: String },

    /// No camera device is present.
    #[error("No camera available at '{device}'")]
    CameraUnavailable { device: String },

    /// The camera is already held by another session.
    #[error("Camera '{device}' is already in use by another session")]
    CameraBusy { device: String },

    /// The device was opened but grabbing a frame failed.
    #[error("Frame capture failed: {detail}")]
    CaptureFailed { detail: String },

    /// Re-encoding the image for upload failed.
    #[error("Image encoding failed: {detail}")]
    ImageEncode { detail: String },

    // ── Remote analysis errors ────────────────────────────────────────────
    /// The analysis service answered with a non-success HTTP status.
    #[error("Analysis service returned HTTP {status}: {body}")]
    RemoteService { status: u16, body: String },

    /// A response was missing a header or field the protocol requires.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The remote job reached the `failed` state.
    #[error("Document analysis failed: {message}")]
    AnalysisFailed { message: String },

    /// The job did not reach a terminal state within the attempt budget.
    #[error("Analysis did not finish after {attempts} poll attempts")]
    PollingTimeout { attempts: u32 },

    /// A poll response body could not be understood.
    #[error("Malformed response from analysis service: {0}")]
    MalformedResponse(String),

    /// Connection-level HTTP failure (DNS, TLS, reset, timeout).
    #[error("HTTP request to '{url}' failed: {reason}")]
    Http { url: String, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Control flow ──────────────────────────────────────────────────────
    /// The scan was cancelled before it finished.
    #[error("Scan cancelled")]
    Cancelled,

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CardScanError {
    /// Short message suitable for showing to an end user.
    ///
    /// The `Display` output carries diagnostic detail (response bodies, hints);
    /// this is the one-line version a notification area can show.
    pub fn user_message(&self) -> &'static str {
        match self {
            CardScanError::FileNotFound { .. } | CardScanError::ReadFailed { .. } => {
                "The selected image could not be opened."
            }
            CardScanError::NotAnImage { .. } => "The selected file is not a supported image.",
            CardScanError::DownloadFailed { .. } | CardScanError::DownloadTimeout { .. } => {
                "The image could not be downloaded."
            }
            CardScanError::PermissionDenied { .. } => {
                "Could not access camera. Please check permissions."
            }
            CardScanError::CameraUnavailable { .. } | CardScanError::CameraBusy { .. } => {
                "No camera is available. Please upload an image instead."
            }
            CardScanError::CaptureFailed { .. } | CardScanError::ImageEncode { .. } => {
                "The photo could not be captured."
            }
            CardScanError::RemoteService { status: 401 | 403, .. } => {
                "The analysis service rejected the credentials."
            }
            CardScanError::PollingTimeout { .. } => "The card took too long to analyse.",
            CardScanError::Cancelled => "The scan was cancelled.",
            _ => "The card could not be read. Please try again.",
        }
    }

    /// Whether the failure came from the camera and an upload is a sensible fallback.
    pub fn is_camera_error(&self) -> bool {
        matches!(
            self,
            CardScanError::PermissionDenied { .. }
                | CardScanError::CameraUnavailable { .. }
                | CardScanError::CameraBusy { .. }
                | CardScanError::CaptureFailed { .. }
        )
    }
}
