use super::*;
use crate::render::frame::{BLACK, blank_canvas};

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];

fn entry(frame: FrameRGBA, x: i64, y: i64) -> PlacedFrame {
    PlacedFrame {
        width: frame.width,
        height: frame.height,
        frame,
        x,
        y,
    }
}

/// Frame whose pixel (x, y) is [x, y, 0, 255].
fn gradient(w: u32, h: u32) -> FrameRGBA {
    let mut data = Vec::new();
    for y in 0..h {
        for x in 0..w {
            data.extend_from_slice(&[x as u8, y as u8, 0, 255]);
        }
    }
    FrameRGBA::new(w, h, data).unwrap()
}

#[test]
fn over_opaque_and_transparent_sources() {
    assert_eq!(over(BLACK, RED), RED);
    assert_eq!(over(RED, [0, 0, 0, 0]), RED);
    // 50% premultiplied green over opaque red.
    assert_eq!(over(RED, [0, 128, 0, 128]), [127, 128, 0, 255]);
}

#[test]
fn fully_off_canvas_entries_contribute_nothing() {
    let base = blank_canvas(4, 4, BLACK);
    let entries = [
        entry(FrameRGBA::solid(2, 2, RED), 4, 0),
        entry(FrameRGBA::solid(2, 2, RED), -2, 0),
        entry(FrameRGBA::solid(2, 2, RED), 0, -10),
        entry(FrameRGBA::solid(2, 2, RED), 100, 100),
    ];
    assert_eq!(composite(&base, &entries), base);
}

#[test]
fn negative_origin_paints_only_the_visible_slice() {
    let base = blank_canvas(4, 4, BLACK);
    let out = composite(&base, &[entry(gradient(3, 3), -1, -2)]);
    // Source (1, 2)..(3, 3) lands on canvas (0, 0)..(2, 1).
    assert_eq!(out.pixel(0, 0), [1, 2, 0, 255]);
    assert_eq!(out.pixel(1, 0), [2, 2, 0, 255]);
    assert_eq!(out.pixel(2, 0), BLACK);
    assert_eq!(out.pixel(0, 1), BLACK);
}

#[test]
fn entries_crossing_the_far_edge_are_clipped() {
    let base = blank_canvas(4, 4, BLACK);
    let out = composite(&base, &[entry(gradient(3, 3), 2, 3)]);
    assert_eq!(out.pixel(2, 3), [0, 0, 0, 255]);
    assert_eq!(out.pixel(3, 3), [1, 0, 0, 255]);
    assert_eq!(out.pixel(1, 3), BLACK);
    assert_eq!(out.pixel(3, 2), BLACK);
}

#[test]
fn later_entries_paint_over_earlier_ones() {
    let base = blank_canvas(4, 4, BLACK);
    let out = composite(
        &base,
        &[
            entry(FrameRGBA::solid(3, 3, RED), 0, 0),
            entry(FrameRGBA::solid(2, 2, GREEN), 1, 1),
        ],
    );
    assert_eq!(out.pixel(0, 0), RED);
    assert_eq!(out.pixel(1, 1), GREEN);
    assert_eq!(out.pixel(2, 2), GREEN);
    assert_eq!(out.pixel(3, 3), BLACK);
}

#[test]
fn painted_region_is_bounded_by_frame_size() {
    let base = blank_canvas(4, 4, BLACK);
    let mut e = entry(FrameRGBA::solid(2, 2, RED), 0, 0);
    e.width = 3;
    e.height = 3;
    let out = composite(&base, &[e]);
    assert_eq!(out.pixel(1, 1), RED);
    assert_eq!(out.pixel(2, 2), BLACK);
}

#[test]
fn malformed_entries_are_skipped_without_aborting() {
    let base = blank_canvas(4, 4, BLACK);
    let mut broken = FrameRGBA::solid(2, 2, RED);
    broken.data.truncate(5);
    let out = composite(
        &base,
        &[
            entry(broken, 0, 0),
            entry(FrameRGBA::solid(0, 0, RED), 0, 0),
            entry(FrameRGBA::solid(1, 1, GREEN), 3, 3),
        ],
    );
    assert_eq!(out.pixel(0, 0), BLACK);
    assert_eq!(out.pixel(3, 3), GREEN);
}

#[test]
fn base_is_not_mutated() {
    let base = blank_canvas(2, 2, BLACK);
    let _ = composite(&base, &[entry(FrameRGBA::solid(2, 2, RED), 0, 0)]);
    assert_eq!(base.pixel(0, 0), BLACK);
}
