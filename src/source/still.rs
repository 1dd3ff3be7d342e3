use std::path::Path;

use anyhow::Context;

use crate::foundation::core::DEFAULT_FPS;
use crate::foundation::error::FramecastResult;
use crate::render::frame::{FrameRGBA, premultiply_rgba8_in_place};
use crate::source::handle::{DecodeHandle, SourceProperties};

/// A still image exposed as a one-frame source; every index returns the same frame.
pub(crate) struct StillImage {
    frame: FrameRGBA,
}

impl StillImage {
    pub(crate) fn open(path: &Path) -> FramecastResult<Self> {
        let img = image::open(path)
            .with_context(|| format!("decode still image '{}'", path.display()))?;
        Ok(Self::from_rgba(img.to_rgba8()))
    }

    pub(crate) fn from_rgba(img: image::RgbaImage) -> Self {
        let mut frame = FrameRGBA::from_image(img);
        premultiply_rgba8_in_place(&mut frame.data);
        Self { frame }
    }
}

impl DecodeHandle for StillImage {
    fn properties(&self) -> SourceProperties {
        SourceProperties {
            width: self.frame.width,
            height: self.frame.height,
            fps: DEFAULT_FPS,
            frame_count: Some(1),
            duration_ms: 0,
        }
    }

    fn read_frame(&mut self, _index: u64) -> FramecastResult<FrameRGBA> {
        Ok(self.frame.clone())
    }
}
