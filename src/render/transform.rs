use image::imageops::{self, FilterType};

use crate::render::frame::FrameRGBA;
use crate::timeline::clip::{ClipDescriptor, Flip, Placement};

/// Largest target edge accepted for a resize.
pub const MAX_TARGET_EDGE: f64 = 16_384.0;

/// A transformed frame and where it lands on the canvas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedFrame {
    /// Pixels to paint.
    pub frame: FrameRGBA,
    /// Left edge in canvas pixels; may be negative.
    pub x: i64,
    /// Top edge in canvas pixels; may be negative.
    pub y: i64,
    /// Target rectangle width.
    pub width: u32,
    /// Target rectangle height.
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Rect {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

/// Fit-and-center rectangle: scale down (never up) preserving aspect ratio.
fn default_rect(src_w: u32, src_h: u32, canvas_w: u32, canvas_h: u32) -> Rect {
    let (sw, sh) = (f64::from(src_w), f64::from(src_h));
    let (cw, ch) = (f64::from(canvas_w), f64::from(canvas_h));
    let (width, height) = if src_w > canvas_w || src_h > canvas_h {
        let scale = (cw / sw).min(ch / sh);
        ((sw * scale).floor().max(1.0), (sh * scale).floor().max(1.0))
    } else {
        (sw, sh)
    };
    Rect {
        left: (cw - width) / 2.0,
        top: (ch - height) / 2.0,
        width,
        height,
    }
}

fn resolve_rect(default: Rect, placement: &Placement) -> Rect {
    Rect {
        left: placement.left.unwrap_or(default.left).floor(),
        top: placement.top.unwrap_or(default.top).floor(),
        width: placement.width.unwrap_or(default.width).round().max(1.0),
        height: placement.height.unwrap_or(default.height).round().max(1.0),
    }
}

fn rect_is_usable(r: &Rect) -> bool {
    [r.left, r.top, r.width, r.height].iter().all(|v| v.is_finite())
        && r.width <= MAX_TARGET_EDGE
        && r.height <= MAX_TARGET_EDGE
        && r.left.abs() < i64::MAX as f64
        && r.top.abs() < i64::MAX as f64
}

/// Resize, flip and position `raw` for `clip` on a `canvas_w` x `canvas_h` canvas.
///
/// Never fails: an unusable target rectangle places the original frame unscaled and centered.
pub fn transform(
    raw: FrameRGBA,
    clip: &ClipDescriptor,
    canvas_w: u32,
    canvas_h: u32,
) -> PlacedFrame {
    let default = default_rect(raw.width, raw.height, canvas_w, canvas_h);
    let rect = resolve_rect(default, &clip.placement);

    if !rect_is_usable(&rect) {
        tracing::warn!(
            clip = %clip.id,
            ?rect,
            "unusable placement, drawing source unscaled"
        );
        let (w, h) = (raw.width, raw.height);
        return PlacedFrame {
            x: ((i64::from(canvas_w) - i64::from(w)) as f64 / 2.0).floor() as i64,
            y: ((i64::from(canvas_h) - i64::from(h)) as f64 / 2.0).floor() as i64,
            width: w,
            height: h,
            frame: raw,
        };
    }

    let (tw, th) = (rect.width as u32, rect.height as u32);
    let close_enough = raw.width.abs_diff(tw) <= 1 && raw.height.abs_diff(th) <= 1;
    let frame = if close_enough && clip.flip == Flip::None {
        raw
    } else {
        let (w, h) = (raw.width, raw.height);
        match raw.into_image() {
            Some(img) => {
                let mut img = if close_enough {
                    img
                } else {
                    imageops::resize(&img, tw, th, FilterType::Nearest)
                };
                if clip.flip.mirrors_columns() {
                    imageops::flip_horizontal_in_place(&mut img);
                }
                if clip.flip.mirrors_rows() {
                    imageops::flip_vertical_in_place(&mut img);
                }
                FrameRGBA::from_image(img)
            }
            None => {
                tracing::warn!(clip = %clip.id, w, h, "frame buffer does not match its size");
                FrameRGBA::solid(0, 0, [0; 4])
            }
        }
    };

    PlacedFrame {
        frame,
        x: rect.left as i64,
        y: rect.top as i64,
        width: tw,
        height: th,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/transform.rs"]
mod tests;
