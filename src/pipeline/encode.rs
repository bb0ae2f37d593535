//! Image encoding: rasters and uploaded images → base64 [`ImagePayload`].
//!
//! Rendered pages are JPEG-encoded at the configured quality; statement
//! pages are mostly flat text on white and compress an order of magnitude
//! better than PNG at the 2× scale they are rendered at. Uploaded image
//! files are forwarded byte-for-byte with their declared MIME type.

use crate::pipeline::input::InputFile;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One encoded raster, the unit of transport to the extraction service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub mime_type: String,
    /// Base64 (standard alphabet, padded) image bytes.
    pub data: String,
}

impl From<ImagePayload> for ImageData {
    fn from(payload: ImagePayload) -> Self {
        ImageData::new(payload.data, payload.mime_type).with_detail("high")
    }
}

/// Encode a rasterised page as a base64 JPEG.
pub fn encode_page(img: &DynamicImage, quality: u8) -> Result<ImagePayload, image::ImageError> {
    // JPEG has no alpha channel; flatten before encoding.
    let rgb = img.to_rgb8();

    let mut buf = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder.encode_image(&rgb)?;
    }

    let data = STANDARD.encode(&buf);
    debug!("Encoded page → {} bytes base64", data.len());

    Ok(ImagePayload {
        mime_type: "image/jpeg".to_string(),
        data,
    })
}

/// Wrap an uploaded image file as-is.
pub fn encode_file(file: &InputFile) -> ImagePayload {
    let data = STANDARD.encode(&file.bytes);
    debug!("Encoded '{}' → {} bytes base64", file.name, data.len());

    ImagePayload {
        mime_type: file.mime_type.clone(),
        data,
    }
}
