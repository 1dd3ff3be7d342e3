use image::ImageEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;

use crate::foundation::error::{FramecastError, FramecastResult};
use crate::render::frame::FrameRGBA;

/// JPEG quality used when none (or an invalid one) is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Compressed output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossy, quality-tunable; alpha is dropped.
    #[default]
    Jpeg,
    /// Lossless RGBA; quality is ignored.
    Png,
}

impl ImageFormat {
    /// MIME type of the encoded bytes.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

fn valid_quality(q: u8) -> bool {
    (1..=100).contains(&q)
}

/// Canvas encoder with a configured format and default quality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameEncoder {
    format: ImageFormat,
    default_quality: u8,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(ImageFormat::Jpeg, DEFAULT_JPEG_QUALITY)
    }
}

impl FrameEncoder {
    /// Build an encoder. A default quality outside `1..=100` is replaced by 75.
    pub fn new(format: ImageFormat, default_quality: u8) -> Self {
        let default_quality = if valid_quality(default_quality) {
            default_quality
        } else {
            tracing::warn!(default_quality, "invalid jpeg quality, using 75");
            DEFAULT_JPEG_QUALITY
        };
        Self {
            format,
            default_quality,
        }
    }

    /// Output format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Encode `canvas`, optionally overriding the JPEG quality for this call.
    pub fn encode(&self, canvas: &FrameRGBA, quality: Option<u8>) -> FramecastResult<Vec<u8>> {
        if canvas.is_degenerate() {
            return Err(FramecastError::encode(format!(
                "cannot encode a {}x{} canvas with {} bytes",
                canvas.width,
                canvas.height,
                canvas.data.len()
            )));
        }
        match self.format {
            ImageFormat::Jpeg => self.encode_jpeg(canvas, self.resolve_quality(quality)),
            ImageFormat::Png => encode_png(canvas),
        }
    }

    fn resolve_quality(&self, quality: Option<u8>) -> u8 {
        match quality {
            Some(q) if valid_quality(q) => q,
            Some(q) => {
                tracing::warn!(quality = q, "jpeg quality out of range, using default");
                self.default_quality
            }
            None => self.default_quality,
        }
    }

    fn encode_jpeg(&self, canvas: &FrameRGBA, quality: u8) -> FramecastResult<Vec<u8>> {
        let mut rgb = Vec::with_capacity(canvas.width as usize * canvas.height as usize * 3);
        for px in canvas.data.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality)
            .encode(&rgb, canvas.width, canvas.height, image::ExtendedColorType::Rgb8)
            .map_err(|e| FramecastError::encode(format!("jpeg: {e}")))?;
        Ok(out)
    }
}

fn encode_png(canvas: &FrameRGBA) -> FramecastResult<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(
            &canvas.data,
            canvas.width,
            canvas.height,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| FramecastError::encode(format!("png: {e}")))?;
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/image_codec.rs"]
mod tests;
