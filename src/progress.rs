//! Progress-callback trait for scan events.
//!
//! Inject an [`Arc<dyn ScanProgressCallback>`] via
//! [`crate::config::ScanConfigBuilder::progress_callback`] to follow a scan
//! through its stages and to receive the single user-facing error
//! notification the orchestrator emits when a scan fails.
//!
//! # Example
//!
//! ```rust
//! use cardscan::{ScanConfig, ScanProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct PollCounter {
//!     polls: AtomicU32,
//! }
//!
//! impl ScanProgressCallback for PollCounter {
//!     fn on_poll(&self, attempt: u32, max_attempts: u32, status: &str) {
//!         self.polls.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("poll {attempt}/{max_attempts}: {status}");
//!     }
//! }
//!
//! let counter = Arc::new(PollCounter { polls: AtomicU32::new(0) });
//!
//! let config = ScanConfig::builder()
//!     .endpoint("https://example.cognitiveservices.azure.com")
//!     .api_key("key")
//!     .progress_callback(counter as Arc<dyn ScanProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ContactInfo;
use std::sync::Arc;

/// Called by the scan pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` because a
/// [`crate::scan::Scanner`] can be shared across tasks.
pub trait ScanProgressCallback: Send + Sync {
    /// Called once the image is compressed and about to be uploaded.
    ///
    /// # Arguments
    /// * `bytes` — size of the upload body
    fn on_scan_start(&self, bytes: usize) {
        let _ = bytes;
    }

    /// Called when the service accepted the image and returned a job handle.
    fn on_submitted(&self, operation_location: &str) {
        let _ = operation_location;
    }

    /// Called after every poll response.
    ///
    /// # Arguments
    /// * `attempt`      — 1-indexed poll number
    /// * `max_attempts` — the configured attempt budget
    /// * `status`       — raw job status reported by the service
    fn on_poll(&self, attempt: u32, max_attempts: u32, status: &str) {
        let _ = (attempt, max_attempts, status);
    }

    /// Called once when a scan produced a contact record.
    fn on_scan_complete(&self, contact: &ContactInfo) {
        let _ = contact;
    }

    /// Called exactly once when a scan fails at any stage.
    ///
    /// # Arguments
    /// * `message` — short, user-facing description
    /// * `detail`  — full diagnostic text of the underlying error
    fn on_scan_error(&self, message: &str, detail: &str) {
        let _ = (message, detail);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ScanProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ScanConfig`].
pub type ProgressCallback = Arc<dyn ScanProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        polls: AtomicUsize,
        errors: AtomicUsize,
        completes: AtomicUsize,
    }

    impl ScanProgressCallback for TrackingCallback {
        fn on_poll(&self, _attempt: u32, _max_attempts: u32, _status: &str) {
            self.polls.fetch_add(1, Ordering::SeqCst);
        }

        fn on_scan_complete(&self, _contact: &ContactInfo) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_scan_error(&self, _message: &str, _detail: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_scan_start(1024);
        cb.on_submitted("https://x/job1");
        cb.on_poll(1, 30, "running");
        cb.on_scan_complete(&ContactInfo::default());
        cb.on_scan_error("failed", "detail");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_poll(1, 30, "notStarted");
        tracker.on_poll(2, 30, "running");
        tracker.on_scan_complete(&ContactInfo::default());

        assert_eq!(tracker.polls.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ScanProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_scan_start(10);
        cb.on_scan_error("x", "y");
    }
}
