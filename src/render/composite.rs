use crate::foundation::math::mul_div255_u16;
use crate::render::frame::FrameRGBA;
use crate::render::transform::PlacedFrame;

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over for premultiplied pixels.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    match src[3] {
        0 => return dst,
        255 => return src,
        _ => {}
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        let dc = mul_div255_u16(u16::from(dst[i]), inv);
        out[i] = (u16::from(src[i]) + dc).min(255) as u8;
    }
    out
}

/// Visible part of an entry: canvas destination origin, source origin and extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ClipRegion {
    pub(crate) dst_x: u32,
    pub(crate) dst_y: u32,
    pub(crate) src_x: u32,
    pub(crate) src_y: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

/// Intersect the target rectangle (bounded by the frame's own size) with the canvas.
pub(crate) fn visible_region(
    entry: &PlacedFrame,
    canvas_w: u32,
    canvas_h: u32,
) -> Option<ClipRegion> {
    let w = i64::from(entry.width.min(entry.frame.width));
    let h = i64::from(entry.height.min(entry.frame.height));
    let x0 = entry.x.max(0);
    let y0 = entry.y.max(0);
    let x1 = entry.x.saturating_add(w).min(i64::from(canvas_w));
    let y1 = entry.y.saturating_add(h).min(i64::from(canvas_h));
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some(ClipRegion {
        dst_x: x0 as u32,
        dst_y: y0 as u32,
        src_x: (x0 - entry.x) as u32,
        src_y: (y0 - entry.y) as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    })
}

fn paint(canvas: &mut FrameRGBA, entry: &PlacedFrame, region: ClipRegion) {
    let cw = canvas.width as usize;
    let fw = entry.frame.width as usize;
    for row in 0..region.height as usize {
        let dst_row = (region.dst_y as usize + row) * cw + region.dst_x as usize;
        let src_row = (region.src_y as usize + row) * fw + region.src_x as usize;
        let dst = &mut canvas.data[dst_row * 4..(dst_row + region.width as usize) * 4];
        let src = &entry.frame.data[src_row * 4..(src_row + region.width as usize) * 4];
        for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
            d.copy_from_slice(&out);
        }
    }
}

/// Paint `entries` in order onto a copy of `base`.
///
/// Entries outside the canvas or without pixels are skipped; malformed entries are logged and
/// skipped without affecting the rest.
pub fn composite(base: &FrameRGBA, entries: &[PlacedFrame]) -> FrameRGBA {
    let mut canvas = base.clone();
    composite_onto(&mut canvas, entries);
    canvas
}

pub(crate) fn composite_onto(canvas: &mut FrameRGBA, entries: &[PlacedFrame]) {
    if canvas.is_degenerate() {
        tracing::warn!(
            width = canvas.width,
            height = canvas.height,
            "cannot composite onto a degenerate canvas"
        );
        return;
    }
    for (i, entry) in entries.iter().enumerate() {
        if entry.frame.width == 0 || entry.frame.height == 0 {
            continue;
        }
        if entry.frame.is_degenerate() {
            tracing::warn!(entry = i, "skipping frame with mismatched buffer");
            continue;
        }
        if let Some(region) = visible_region(entry, canvas.width, canvas.height) {
            paint(canvas, entry, region);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
