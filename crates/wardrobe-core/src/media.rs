//! Image preprocessing for engine transport.
//!
//! Photos come straight off a camera roll and are far larger than the model
//! needs. Before a prompt is built the image is decoded, downscaled to the
//! configured target, re-encoded as JPEG, and wrapped as a base64 payload.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::DynamicImage;
use std::io::Cursor;

use crate::config::ImageConfig;
use crate::error::MediaError;

/// Base64-encoded image ready to embed in a prompt turn.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Create an `ImageInput` from raw bytes and a format identifier
    /// (e.g., "jpeg", "png", "webp"). Unrecognized formats fall back to
    /// JPEG, which is what the preprocessing path always produces anyway.
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        let media_type = match format {
            "png" => "image/png",
            "webp" => "image/webp",
            "jpeg" | "jpg" => "image/jpeg",
            other => {
                tracing::warn!("Unknown image format '{other}', labelling as image/jpeg");
                "image/jpeg"
            }
        };

        Self {
            data: BASE64.encode(bytes),
            media_type: media_type.to_string(),
        }
    }
}

/// Decode, downscale, and re-encode an image for inference.
///
/// Decoding and resizing are CPU-bound, so the work runs on the blocking
/// thread pool. Images already within the target keep their dimensions but
/// are still re-encoded to JPEG for a uniform engine payload.
pub async fn prepare_image(bytes: Vec<u8>, config: &ImageConfig) -> Result<ImageInput, MediaError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || prepare_image_sync(&bytes, &config))
        .await
        .map_err(|e| MediaError::Decode(format!("preprocessing task failed: {e}")))?
}

fn prepare_image_sync(bytes: &[u8], config: &ImageConfig) -> Result<ImageInput, MediaError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| MediaError::Decode(format!("failed to decode image: {e}")))?;

    let (width, height) = (image.width(), image.height());
    let resized = if width > config.resize_width || height > config.resize_height {
        // Aspect-preserving fit, longest edge at the target
        image.thumbnail(config.resize_width, config.resize_height)
    } else {
        image
    };
    tracing::debug!(
        "Prepared image: {width}x{height} -> {}x{}",
        resized.width(),
        resized.height()
    );

    encode_jpeg(&resized, config.jpeg_quality)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<ImageInput, MediaError> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    // JPEG has no alpha channel
    image
        .to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| MediaError::Encode(format!("failed to encode JPEG: {e}")))?;

    Ok(ImageInput {
        data: BASE64.encode(buffer.into_inner()),
        media_type: "image/jpeg".to_string(),
    })
}
