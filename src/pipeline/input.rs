//! Upload path: turn a user-supplied file path or URL into a [`CapturedImage`].
//!
//! Both paths end in [`CapturedImage::from_bytes`], so a text file or PDF
//! handed in by mistake is rejected here with a readable error instead of
//! being shipped to the analysis service.

use crate::error::CardScanError;
use crate::pipeline::capture::{CapturedImage, ImageSource};
use std::path::PathBuf;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the image named by `input`, downloading it when it is a URL.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<CapturedImage, CardScanError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(PathBuf::from(input)).await
    }
}

/// Read a local image file.
pub async fn read_local(path: PathBuf) -> Result<CapturedImage, CardScanError> {
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CardScanError::FileNotFound { path });
        }
        Err(e) => return Err(CardScanError::ReadFailed { path, source: e }),
    };

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    CapturedImage::from_bytes(bytes, ImageSource::Upload { path })
}

/// Download an image over HTTP(S).
async fn download_url(url: &str, timeout_secs: u64) -> Result<CapturedImage, CardScanError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CardScanError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            CardScanError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            CardScanError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(CardScanError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| CardScanError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    CapturedImage::from_bytes(
        bytes.to_vec(),
        ImageSource::Url {
            url: url.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/card.jpg"));
        assert!(is_url("http://example.com/card.jpg"));
        assert!(!is_url("/tmp/card.jpg"));
        assert!(!is_url("card.jpg"));
        assert!(!is_url(""));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = resolve_input("/definitely/not/here/card.jpg", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, CardScanError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn local_jpeg_is_loaded() {
        let file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(30, 20, Rgb([120, 0, 0])))
            .save(file.path())
            .unwrap();

        let img = resolve_input(file.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(img.mime_type, "image/jpeg");
        assert_eq!((img.width, img.height), (30, 20));
        assert!(matches!(img.source, ImageSource::Upload { .. }));
    }

    #[tokio::test]
    async fn text_file_is_not_an_image() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "BEGIN:VCARD\nEND:VCARD\n").unwrap();
        let err = resolve_input(file.path().to_str().unwrap(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, CardScanError::NotAnImage { .. }));
    }
}
