//! The captured image handed from acquisition to the analysis client.
//!
//! A [`CapturedImage`] always holds *encoded* bytes (JPEG or PNG) together
//! with their MIME type and pixel dimensions. Constructors validate the
//! bytes up front so later stages never see something the service would
//! reject as "not an image".

use crate::error::CardScanError;
use crate::pipeline::compress::encode_jpeg;
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;

/// Where an image came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSource {
    /// A frame grabbed from a camera device.
    Camera { device: String },
    /// A file chosen by the user.
    Upload { path: PathBuf },
    /// An image downloaded from a URL.
    Url { url: String },
    /// Bytes supplied directly by a library caller.
    Memory,
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Camera { device } => write!(f, "camera {device}"),
            ImageSource::Upload { path } => write!(f, "{}", path.display()),
            ImageSource::Url { url } => f.write_str(url),
            ImageSource::Memory => f.write_str("<memory>"),
        }
    }
}

/// Encoded image bytes ready for upload.
#[derive(Clone)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub source: ImageSource,
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("source", &self.source)
            .finish()
    }
}

impl CapturedImage {
    /// Wrap already-encoded bytes, validating that they are a JPEG or PNG.
    ///
    /// Only the header is parsed here; the full decode happens in
    /// [`crate::pipeline::compress`] when the image needs resizing.
    pub fn from_bytes(bytes: Vec<u8>, source: ImageSource) -> Result<Self, CardScanError> {
        let not_an_image = |detail: String| CardScanError::NotAnImage {
            origin: source.to_string(),
            detail,
        };

        let format = image::guess_format(&bytes).map_err(|e| not_an_image(e.to_string()))?;
        let mime_type = match format {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            other => return Err(not_an_image(format!("unsupported format {other:?}"))),
        };

        let (width, height) = ImageReader::with_format(Cursor::new(&bytes), format)
            .into_dimensions()
            .map_err(|e| not_an_image(e.to_string()))?;
        if width == 0 || height == 0 {
            return Err(not_an_image("image has zero size".into()));
        }

        Ok(Self {
            bytes,
            mime_type,
            width,
            height,
            source,
        })
    }

    /// Encode a raster (e.g. a camera frame) as JPEG at the given quality.
    pub fn from_raster(
        img: &DynamicImage,
        quality: u8,
        source: ImageSource,
    ) -> Result<Self, CardScanError> {
        let bytes = encode_jpeg(img, quality)?;
        Ok(Self {
            bytes,
            mime_type: "image/jpeg",
            width: img.width(),
            height: img.height(),
            source,
        })
    }

    /// Decode the full raster.
    pub fn decode(&self) -> Result<DynamicImage, CardScanError> {
        image::load_from_memory(&self.bytes).map_err(|e| CardScanError::NotAnImage {
            origin: self.source.to_string(),
            detail: e.to_string(),
        })
    }

    pub fn longer_edge(&self) -> u32 {
        self.width.max(self.height)
    }

    /// File name used for multipart uploads.
    pub fn file_name(&self) -> &'static str {
        match self.mime_type {
            "image/png" => "card.png",
            _ => "card.jpg",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 200, 200])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn png_is_accepted_with_dimensions() {
        let img = CapturedImage::from_bytes(png_bytes(40, 25), ImageSource::Memory).unwrap();
        assert_eq!(img.mime_type, "image/png");
        assert_eq!((img.width, img.height), (40, 25));
        assert_eq!(img.longer_edge(), 40);
        assert_eq!(img.file_name(), "card.png");
    }

    #[test]
    fn garbage_is_rejected() {
        let err = CapturedImage::from_bytes(b"%PDF-1.7 not an image".to_vec(), ImageSource::Memory)
            .unwrap_err();
        assert!(matches!(err, CardScanError::NotAnImage { .. }));
    }

    #[test]
    fn raster_is_encoded_as_jpeg() {
        let frame = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 9, Rgb([10, 20, 30])));
        let img = CapturedImage::from_raster(
            &frame,
            70,
            ImageSource::Camera {
                device: "/dev/video0".into(),
            },
        )
        .unwrap();
        assert_eq!(img.mime_type, "image/jpeg");
        assert_eq!(&img.bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(img.decode().unwrap().width(), 16);
    }
}
