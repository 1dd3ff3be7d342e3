use super::*;

fn canvas() -> FrameRGBA {
    let mut data = Vec::new();
    for y in 0..32u32 {
        for x in 0..48u32 {
            data.extend_from_slice(&[(x * 5) as u8, (y * 7) as u8, 90, 255]);
        }
    }
    FrameRGBA::new(48, 32, data).unwrap()
}

#[test]
fn jpeg_output_is_deterministic_and_decodable() {
    let enc = FrameEncoder::default();
    let a = enc.encode(&canvas(), None).unwrap();
    let b = enc.encode(&canvas(), None).unwrap();
    assert_eq!(a, b);
    assert_eq!(&a[..2], &[0xFF, 0xD8]);

    let decoded = image::load_from_memory(&a).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (48, 32));
}

#[test]
fn quality_changes_output_and_invalid_quality_falls_back() {
    let enc = FrameEncoder::default();
    let low = enc.encode(&canvas(), Some(5)).unwrap();
    let high = enc.encode(&canvas(), Some(100)).unwrap();
    assert_ne!(low, high);

    let default = enc.encode(&canvas(), None).unwrap();
    assert_eq!(enc.encode(&canvas(), Some(0)).unwrap(), default);
    assert_eq!(enc.encode(&canvas(), Some(101)).unwrap(), default);
}

#[test]
fn invalid_default_quality_is_replaced() {
    let enc = FrameEncoder::new(ImageFormat::Jpeg, 0);
    assert_eq!(enc, FrameEncoder::default());
}

#[test]
fn png_is_lossless_and_ignores_quality() {
    let enc = FrameEncoder::new(ImageFormat::Png, 75);
    let bytes = enc.encode(&canvas(), Some(3)).unwrap();
    assert_eq!(bytes, enc.encode(&canvas(), None).unwrap());

    let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(decoded.into_raw(), canvas().data);
}

#[test]
fn degenerate_canvas_is_an_error() {
    let mut c = canvas();
    c.data.truncate(10);
    assert!(matches!(
        FrameEncoder::default().encode(&c, None),
        Err(FramecastError::Encode(_))
    ));
}

#[test]
fn mime_types() {
    assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
    assert_eq!(ImageFormat::Png.mime_type(), "image/png");
}
