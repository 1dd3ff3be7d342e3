use super::*;
use crate::foundation::core::Fps;
use crate::timeline::clip::ClipRecord;

fn clip(rec: ClipRecord) -> ClipDescriptor {
    ClipDescriptor::from_record(&rec, Fps::default()).unwrap()
}

fn base() -> ClipRecord {
    ClipRecord::new("c", "/m/a.mp4", 0, 1000)
}

/// 2x2 frame: red, green on top; blue, white below.
fn quad() -> FrameRGBA {
    FrameRGBA::new(
        2,
        2,
        vec![
            255, 0, 0, 255, 0, 255, 0, 255, //
            0, 0, 255, 255, 255, 255, 255, 255,
        ],
    )
    .unwrap()
}

#[test]
fn default_placement_fits_and_centers_large_sources() {
    let raw = FrameRGBA::solid(300, 200, [9, 9, 9, 255]);
    let placed = transform(raw, &clip(base()), 160, 90);
    // scale = min(160/300, 90/200) = 0.45 -> 135x90
    assert_eq!((placed.width, placed.height), (135, 90));
    assert_eq!((placed.frame.width, placed.frame.height), (135, 90));
    assert_eq!((placed.x, placed.y), (12, 0));
}

#[test]
fn default_placement_never_upscales() {
    let raw = FrameRGBA::solid(100, 50, [9, 9, 9, 255]);
    let placed = transform(raw, &clip(base()), 1280, 720);
    assert_eq!((placed.frame.width, placed.frame.height), (100, 50));
    assert_eq!((placed.x, placed.y), (590, 335));
}

#[test]
fn explicit_rect_resizes_and_positions() {
    let raw = FrameRGBA::solid(300, 200, [9, 9, 9, 255]);
    let placed = transform(raw, &clip(base().with_rect(10.7, -20.2, 150.4, 99.6)), 1280, 720);
    assert_eq!((placed.x, placed.y), (10, -21));
    assert_eq!((placed.width, placed.height), (150, 100));
    assert_eq!((placed.frame.width, placed.frame.height), (150, 100));
}

#[test]
fn partial_placement_keeps_defaults_for_missing_fields() {
    let raw = FrameRGBA::solid(100, 50, [9, 9, 9, 255]);
    let p = Placement {
        left: Some(0.0),
        ..Placement::default()
    };
    let placed = transform(raw, &clip(base().with_placement(p)), 1280, 720);
    assert_eq!((placed.x, placed.y), (0, 335));
    assert_eq!((placed.width, placed.height), (100, 50));
}

#[test]
fn resize_is_skipped_within_one_pixel() {
    let raw = FrameRGBA::solid(300, 200, [9, 9, 9, 255]);
    let placed = transform(raw, &clip(base().with_rect(0.0, 0.0, 301.0, 199.0)), 1280, 720);
    assert_eq!((placed.width, placed.height), (301, 199));
    assert_eq!((placed.frame.width, placed.frame.height), (300, 200));
}

#[test]
fn nearest_neighbor_upscale_duplicates_pixels() {
    let placed = transform(quad(), &clip(base().with_rect(0.0, 0.0, 4.0, 4.0)), 8, 8);
    assert_eq!(placed.frame.pixel(0, 0), [255, 0, 0, 255]);
    assert_eq!(placed.frame.pixel(1, 1), [255, 0, 0, 255]);
    assert_eq!(placed.frame.pixel(3, 0), [0, 255, 0, 255]);
    assert_eq!(placed.frame.pixel(0, 3), [0, 0, 255, 255]);
    assert_eq!(placed.frame.pixel(3, 3), [255, 255, 255, 255]);
}

#[test]
fn flips_mirror_after_resize() {
    let h = transform(quad(), &clip(base().with_flip(Flip::Horizontal)), 8, 8);
    assert_eq!(h.frame.pixel(0, 0), [0, 255, 0, 255]);
    assert_eq!(h.frame.pixel(1, 0), [255, 0, 0, 255]);

    let v = transform(quad(), &clip(base().with_flip(Flip::Vertical)), 8, 8);
    assert_eq!(v.frame.pixel(0, 0), [0, 0, 255, 255]);

    let both = transform(quad(), &clip(base().with_flip(Flip::Both)), 8, 8);
    assert_eq!(both.frame.pixel(0, 0), [255, 255, 255, 255]);
    assert_eq!(both.frame.pixel(1, 1), [255, 0, 0, 255]);
}

#[test]
fn oversized_target_falls_back_to_native_size_centered() {
    let raw = FrameRGBA::solid(100, 50, [9, 9, 9, 255]);
    let placed = transform(raw, &clip(base().with_rect(0.0, 0.0, 1e9, 10.0)), 1280, 720);
    assert_eq!((placed.width, placed.height), (100, 50));
    assert_eq!((placed.frame.width, placed.frame.height), (100, 50));
    assert_eq!((placed.x, placed.y), (590, 335));
}
