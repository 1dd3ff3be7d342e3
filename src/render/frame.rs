use crate::foundation::error::{FramecastError, FramecastResult};

/// Opaque black, the default canvas fill.
pub const BLACK: [u8; 4] = [0, 0, 0, 255];

/// CPU-side frame buffer.
///
/// Pixels are tightly packed RGBA8, row-major, with premultiplied alpha.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// Wrap an existing pixel buffer, checking its length.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> FramecastResult<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(FramecastError::validation(format!(
                "frame {width}x{height} expects {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Frame filled with one color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let n = width as usize * height as usize;
        let mut data = Vec::with_capacity(n * 4);
        for _ in 0..n {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Pixel at `(x, y)`.
    ///
    /// Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// `true` when the frame holds no pixels or its buffer does not match its size.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0
            || self.height == 0
            || self.data.len() != self.width as usize * self.height as usize * 4
    }

    pub(crate) fn into_image(self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data)
    }

    pub(crate) fn from_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

/// Fresh canvas filled with `fill`. Zero dimensions produce a 1x1 canvas.
pub fn blank_canvas(width: u32, height: u32, fill: [u8; 4]) -> FrameRGBA {
    FrameRGBA::solid(width.max(1), height.max(1), fill)
}

/// Convert straight-alpha RGBA8 into premultiplied alpha in place.
pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = crate::foundation::math::mul_div255_u8(u16::from(*c), a);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
