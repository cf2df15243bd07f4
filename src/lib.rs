//! # cardscan
//!
//! Extract contact details from a photo of a business card.
//!
//! The card image is acquired from a camera, a file or a URL, shrunk to a
//! sensible upload size, and sent to a remote document-analysis service
//! (the prebuilt business-card model of a Form Recognizer style API). The
//! service's asynchronous job is polled to completion and its heterogeneous
//! field shapes are normalized into one flat [`ContactInfo`].
//!
//! ## Pipeline Overview
//!
//! ```text
//! image
//!  │
//!  ├─ 1. Acquire    camera session (released on every path) / file / URL
//!  ├─ 2. Compress   longer edge ≤ 1200 px, JPEG (spawn_blocking)
//!  ├─ 3. Submit     POST …/documentModels/{model}:analyze → Operation-Location
//!  ├─ 4. Poll       fixed 1 s interval, at most 30 GETs, cancellable
//!  ├─ 5. Normalize  ordered probe table per field → ContactInfo
//!  └─ 6. Clean up   whitespace, invisible chars, phone number run
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardscan::{ScanConfig, Scanner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads CARDSCAN_ENDPOINT / CARDSCAN_API_KEY / CARDSCAN_MODEL
//!     let scanner = Scanner::new(ScanConfig::from_env()?)?;
//!     let image = scanner.load_image("card.jpg").await?;
//!     let contact = scanner.extract_contact_from_image(image).await;
//!     println!("{} <{}>", contact.name, contact.email);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cardscan` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod scan;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ScanConfig, ScanConfigBuilder, UploadMode};
pub use error::CardScanError;
pub use output::{ContactField, ContactInfo, ScanReport};
pub use pipeline::analyze::{AnalysisClient, AnalysisJobHandle};
pub use pipeline::camera::{CameraDevice, CameraSession, CameraStream, CommandCamera, Facing};
pub use pipeline::capture::{CapturedImage, ImageSource};
pub use pipeline::normalize::normalize;
pub use pipeline::poll::{AnalysisResult, JobStatus};
pub use pipeline::transport::{AnalysisTransport, HttpReply, ReqwestTransport, UploadBody};
pub use progress::{NoopProgressCallback, ProgressCallback, ScanProgressCallback};
pub use scan::{extract_contact_from_image, Scanner};
