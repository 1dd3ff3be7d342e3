use std::sync::{Arc, OnceLock};

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{FramecastError, FramecastResult};
use crate::render::composite::composite_onto;
use crate::render::frame::FrameRGBA;
use crate::render::transform::PlacedFrame;

/// Text stamped onto a rendered frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Overlay {
    /// The timeline has no clips at all.
    NoClips(FrameIndex),
    /// Clips exist but none produced pixels for this frame.
    NoVisibleClips(FrameIndex),
    /// Frame-index stamp on a composited frame.
    FrameStamp(FrameIndex),
}

impl Overlay {
    /// Label drawn for this overlay.
    pub fn text(self) -> String {
        match self {
            Overlay::NoClips(f) => format!("No Clips (F:{})", f.0),
            Overlay::NoVisibleClips(f) => format!("No Visible Clips (F:{})", f.0),
            Overlay::FrameStamp(f) => format!("F:{}", f.0),
        }
    }

    fn centered(self) -> bool {
        !matches!(self, Overlay::FrameStamp(_))
    }
}

fn fontdb() -> Arc<usvg::fontdb::Database> {
    static DB: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    Arc::clone(DB.get_or_init(|| {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.len(), "loaded system fonts for overlays");
        Arc::new(db)
    }))
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Rasterize `text` as a label on a translucent dark plate.
fn rasterize_label(text: &str, font_px: u32) -> FramecastResult<FrameRGBA> {
    let pad = font_px / 2;
    let width = (text.chars().count() as u32 * font_px * 3 / 5 + pad * 2).max(1);
    let height = font_px + pad * 2;
    let svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">
<rect width="{width}" height="{height}" fill="black" fill-opacity="0.6"/>
<text x="{pad}" y="{baseline}" font-family="DejaVu Sans, Liberation Sans, Arial, sans-serif" font-size="{font_px}" fill="white">{text}</text>
</svg>"#,
        baseline = pad + font_px * 4 / 5,
        text = escape_xml(text),
    );

    let opts = usvg::Options {
        fontdb: fontdb(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_data(svg.as_bytes(), &opts)
        .map_err(|e| FramecastError::encode(format!("overlay svg: {e}")))?;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| FramecastError::encode("failed to allocate overlay pixmap"))?;
    resvg::render(&tree, resvg::tiny_skia::Transform::identity(), &mut pixmap.as_mut());
    FrameRGBA::new(width, height, pixmap.data().to_vec())
}

/// Draw `overlay` onto `canvas`: placeholders centered, frame stamps in the top-left corner.
pub fn draw_overlay(canvas: &mut FrameRGBA, overlay: Overlay) -> FramecastResult<()> {
    let font_px = (canvas.height / 24).clamp(10, 64);
    let label = rasterize_label(&overlay.text(), font_px)?;
    let (x, y) = if overlay.centered() {
        (
            (i64::from(canvas.width) - i64::from(label.width)) / 2,
            (i64::from(canvas.height) - i64::from(label.height)) / 2,
        )
    } else {
        let margin = i64::from(font_px / 2);
        (margin, margin)
    };
    let placed = PlacedFrame {
        width: label.width,
        height: label.height,
        frame: label,
        x,
        y,
    };
    composite_onto(canvas, std::slice::from_ref(&placed));
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/overlay.rs"]
mod tests;
