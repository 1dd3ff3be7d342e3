use super::*;

const PROJECT: &str = r#"{
    "canvas": {"width": 640, "height": 360},
    "fps": 25,
    "totalFrames": 250,
    "clips": [
        {"clipId": 7, "sourcePath": "/media/a.mp4", "startTimeOnTrackMs": 0, "endTimeOnTrackMs": 2000}
    ]
}"#;

#[test]
fn parses_full_document() {
    let doc = TimelineDocument::from_json_str(PROJECT).unwrap();
    assert_eq!(
        doc.canvas,
        Some(CanvasSize {
            width: 640,
            height: 360
        })
    );
    assert_eq!(doc.fps, Some(25.0));
    assert_eq!(doc.total_frames, Some(250));
    assert_eq!(doc.clips.len(), 1);
    assert_eq!(doc.clips[0].clip_id, "7");
}

#[test]
fn optional_fields_default_to_none() {
    let doc = TimelineDocument::from_json_str(r#"{"clips": []}"#).unwrap();
    assert_eq!(doc, TimelineDocument::default());
    assert!(TimelineDocument::from_json_str("[1, 2]").is_err());
}

#[test]
fn json_source_reads_file_each_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.json");
    std::fs::write(&path, PROJECT).unwrap();

    let mut source = JsonTimelineSource::new(&path);
    assert_eq!(source.load().unwrap().clips.len(), 1);

    std::fs::write(&path, r#"{"clips": []}"#).unwrap();
    assert!(source.load().unwrap().clips.is_empty());
}

#[test]
fn json_source_missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = JsonTimelineSource::new(dir.path().join("absent.json"));
    assert!(matches!(source.load(), Err(FramecastError::NotFound(_))));
}

#[test]
fn json_source_invalid_document_is_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    let mut source = JsonTimelineSource::new(&path);
    assert!(matches!(source.load(), Err(FramecastError::Validation(_))));
}

#[test]
fn static_source_returns_current_document() {
    let mut source = StaticTimelineSource::default();
    assert!(source.load().unwrap().clips.is_empty());
    source.set(TimelineDocument::from_json_str(PROJECT).unwrap());
    assert_eq!(source.load().unwrap().total_frames, Some(250));
}
