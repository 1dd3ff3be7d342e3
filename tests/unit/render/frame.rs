use super::*;

#[test]
fn blank_canvas_never_has_zero_dimensions() {
    let c = blank_canvas(0, 0, BLACK);
    assert_eq!((c.width, c.height), (1, 1));
    assert_eq!(c.pixel(0, 0), BLACK);

    let c = blank_canvas(4, 2, [1, 2, 3, 255]);
    assert_eq!(c.data.len(), 4 * 2 * 4);
    assert_eq!(c.pixel(3, 1), [1, 2, 3, 255]);
}

#[test]
fn new_checks_buffer_length() {
    assert!(FrameRGBA::new(2, 2, vec![0; 16]).is_ok());
    assert!(FrameRGBA::new(2, 2, vec![0; 15]).is_err());
    assert!(FrameRGBA::new(0, 2, Vec::new()).is_err());
}

#[test]
fn premultiply_scales_color_by_alpha() {
    let mut px = [100u8, 50, 200, 128, 9, 9, 9, 255, 7, 7, 7, 0];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(
        &px[..4],
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128
        ]
    );
    assert_eq!(&px[4..8], &[9, 9, 9, 255]);
    assert_eq!(&px[8..], &[0, 0, 0, 0]);
}

#[test]
fn degenerate_detection() {
    let mut f = FrameRGBA::solid(2, 2, BLACK);
    assert!(!f.is_degenerate());
    f.data.pop();
    assert!(f.is_degenerate());
}
