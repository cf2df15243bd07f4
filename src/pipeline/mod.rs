//! Pipeline stages for business-card extraction.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the network-facing stages can run against a fake transport.
//!
//! ## Data Flow
//!
//! ```text
//! camera / input ──▶ compress ──▶ analyze ──▶ poll ──▶ normalize ──▶ cleanup
//!  (acquire)        (≤1200 px)   (POST)     (GET…)   (probe table)  (tidy)
//! ```
//!
//! 1. [`camera`] / [`input`] — acquire a [`capture::CapturedImage`] from a
//!    camera session, a local file or a URL
//! 2. [`compress`]  — downscale and re-encode oversized images; runs in
//!    `spawn_blocking` because decoding is CPU-bound
//! 3. [`analyze`]   — submit the image, obtain the job handle
//! 4. [`poll`]      — fixed-interval polling until a terminal status
//! 5. [`normalize`] — map the vendor's field shapes to a flat record
//! 6. [`cleanup`]   — deterministic whitespace/phone tidying
//!
//! [`transport`] is the HTTP seam used by stages 3 and 4.

pub mod analyze;
pub mod camera;
pub mod capture;
pub mod cleanup;
pub mod compress;
pub mod input;
pub mod normalize;
pub mod poll;
pub mod transport;
