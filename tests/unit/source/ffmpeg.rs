use super::*;

#[test]
fn ff_ratio_parsing() {
    assert_eq!(parse_ff_ratio("30000/1001"), Some((30000, 1001)));
    assert_eq!(parse_ff_ratio("25/1"), Some((25, 1)));
    assert_eq!(parse_ff_ratio("0/0"), None);
    assert_eq!(parse_ff_ratio("abc"), None);
}

#[cfg(not(feature = "media-ffmpeg"))]
#[test]
fn video_requires_feature() {
    let err = open_video(Path::new("clip.mp4")).err().unwrap();
    assert!(err.to_string().contains("media-ffmpeg"));
}

#[cfg(feature = "media-ffmpeg")]
fn ffmpeg_available() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
        && std::process::Command::new("ffprobe")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
}

#[cfg(feature = "media-ffmpeg")]
#[test]
fn decodes_sequential_and_seeked_frames() {
    if !ffmpeg_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("testsrc.mp4");
    let status = std::process::Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "testsrc=size=64x48:rate=10:duration=2",
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success());

    let mut h = open_video(&path).unwrap();
    let props = h.properties();
    assert_eq!((props.width, props.height), (64, 48));
    assert!((props.fps - 10.0).abs() < 1e-6);

    let f0 = h.read_frame(0).unwrap();
    let f1 = h.read_frame(1).unwrap();
    assert_eq!(f0.data.len(), 64 * 48 * 4);
    assert_ne!(f0, f1);

    let seeked = h.read_frame(0).unwrap();
    assert_eq!(seeked, f0);
}
