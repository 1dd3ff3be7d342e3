use std::path::Path;

use crate::foundation::error::{FramecastError, FramecastResult};
use crate::render::frame::FrameRGBA;

/// Basic properties of an opened source.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct SourceProperties {
    /// Decoded frame width.
    pub width: u32,
    /// Decoded frame height.
    pub height: u32,
    /// Native frame rate of the source.
    pub fps: f64,
    /// Number of decodable frames, when the container reports it.
    pub frame_count: Option<u64>,
    /// Source duration in milliseconds.
    pub duration_ms: u64,
}

impl SourceProperties {
    /// Clamp `index` to the last frame when the frame count is known.
    pub fn clamp_index(&self, index: u64) -> u64 {
        match self.frame_count {
            Some(n) => index.min(n.saturating_sub(1)),
            None => index,
        }
    }
}

/// An open decoder for one source file.
///
/// Handles are not required to be thread-safe: [`crate::VideoSource`] serializes every seek and
/// read behind a per-handle mutex.
pub trait DecodeHandle: Send {
    /// Properties reported when the source was opened.
    fn properties(&self) -> SourceProperties;

    /// Seek to `index` and decode one frame.
    fn read_frame(&mut self, index: u64) -> FramecastResult<FrameRGBA>;
}

/// Factory for decode handles.
pub trait SourceOpener: Send + Sync {
    /// Open `path`. Missing files yield [`FramecastError::NotFound`].
    fn open(&self, path: &Path) -> FramecastResult<Box<dyn DecodeHandle>>;
}

const STILL_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

pub(crate) fn is_still_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| STILL_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Default opener: still images through `image`, everything else through ffmpeg.
#[derive(Clone, Copy, Debug, Default)]
pub struct MediaOpener;

impl SourceOpener for MediaOpener {
    fn open(&self, path: &Path) -> FramecastResult<Box<dyn DecodeHandle>> {
        if !path.is_file() {
            return Err(FramecastError::not_found(format!(
                "source '{}' does not exist",
                path.display()
            )));
        }
        if is_still_image(path) {
            return Ok(Box::new(crate::source::still::StillImage::open(path)?));
        }
        crate::source::ffmpeg::open_video(path)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/handle.rs"]
mod tests;
