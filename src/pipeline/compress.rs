//! Size normalization: bound the upload to `max_image_edge` pixels.
//!
//! Phone cameras produce 12-megapixel frames; the analysis service reads a
//! business card just as well at 1200 px on the long edge, and the upload
//! shrinks by an order of magnitude. Images already within bounds are
//! forwarded byte-for-byte so a small PNG is never re-encoded lossily.

use crate::error::CardScanError;
use crate::pipeline::capture::CapturedImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::{debug, info};

/// Encode a raster as baseline JPEG.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, CardScanError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(&img.to_rgb8())
        .map_err(|e| CardScanError::ImageEncode {
            detail: e.to_string(),
        })?;
    debug!(
        "Encoded {}x{} JPEG at q{} → {} bytes",
        img.width(),
        img.height(),
        quality,
        buf.len()
    );
    Ok(buf)
}

/// Target dimensions that fit `width × height` inside a `max_edge` square.
///
/// The longer edge becomes exactly `max_edge`; the shorter edge is scaled
/// by the same factor and rounded to the nearest pixel (never below 1).
pub fn fit_within(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let max_edge = max_edge.max(1);
    let longer = width.max(height);
    if longer <= max_edge || longer == 0 {
        return (width, height);
    }
    let scale = |edge: u32| -> u32 {
        let scaled = (edge as u64 * max_edge as u64 + longer as u64 / 2) / longer as u64;
        (scaled as u32).max(1)
    };
    if width >= height {
        (max_edge, scale(height))
    } else {
        (scale(width), max_edge)
    }
}

/// Downscale `image` when its longer edge exceeds `max_edge`.
///
/// Decoding and resampling are CPU-bound, so the work runs on the blocking
/// pool rather than a runtime worker.
pub async fn compress_for_upload(
    image: CapturedImage,
    max_edge: u32,
    quality: u8,
) -> Result<CapturedImage, CardScanError> {
    if image.longer_edge() <= max_edge {
        debug!(
            "Image {}x{} within {} px, uploading as-is",
            image.width, image.height, max_edge
        );
        return Ok(image);
    }

    tokio::task::spawn_blocking(move || compress_blocking(image, max_edge, quality))
        .await
        .map_err(|e| CardScanError::Internal(format!("Compression task panicked: {e}")))?
}

fn compress_blocking(
    image: CapturedImage,
    max_edge: u32,
    quality: u8,
) -> Result<CapturedImage, CardScanError> {
    let raster = image.decode()?;
    let (w, h) = fit_within(raster.width(), raster.height(), max_edge);
    let resized = raster.resize_exact(w, h, FilterType::Triangle);
    let bytes = encode_jpeg(&resized, quality)?;

    info!(
        "Downscaled {}x{} → {}x{} ({} → {} bytes)",
        image.width,
        image.height,
        w,
        h,
        image.bytes.len(),
        bytes.len()
    );

    Ok(CapturedImage {
        bytes,
        mime_type: "image/jpeg",
        width: w,
        height: h,
        source: image.source,
    })
}
