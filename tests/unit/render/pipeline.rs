use std::path::Path;

use super::*;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{FramecastError, FramecastResult};
use crate::source::handle::{DecodeHandle, SourceOpener, SourceProperties};
use crate::timeline::clip::ClipRecord;
use crate::timeline::state::TimelineState;

/// Every frame is a solid 4x4 block colored by path and index.
struct SolidHandle {
    red: u8,
}

impl DecodeHandle for SolidHandle {
    fn properties(&self) -> SourceProperties {
        SourceProperties {
            width: 4,
            height: 4,
            fps: 30.0,
            frame_count: None,
            duration_ms: 0,
        }
    }

    fn read_frame(&mut self, index: u64) -> FramecastResult<FrameRGBA> {
        Ok(FrameRGBA::solid(4, 4, [self.red, index as u8, 0, 255]))
    }
}

struct SolidOpener;

impl SourceOpener for SolidOpener {
    fn open(&self, path: &Path) -> FramecastResult<Box<dyn DecodeHandle>> {
        match path.to_str() {
            Some("red") => Ok(Box::new(SolidHandle { red: 255 })),
            Some("dim") => Ok(Box::new(SolidHandle { red: 40 })),
            _ => Err(FramecastError::not_found(path.display().to_string())),
        }
    }
}

fn pipeline(cache_entries: usize) -> FramePipeline {
    let opts = PipelineOpts {
        frame_cache_entries: cache_entries,
        overlays: false,
        ..PipelineOpts::default()
    };
    FramePipeline::new(Arc::new(VideoSource::new(Arc::new(SolidOpener), 4)), &opts)
}

fn timeline(records: &[ClipRecord]) -> TimelineState {
    let s = TimelineState::new(Canvas::new(8, 8).unwrap(), Fps::default(), 90);
    s.update(records, 90, None);
    s
}

#[test]
fn compose_places_and_stacks_active_clips() {
    let p = pipeline(8);
    let t = timeline(&[
        ClipRecord::new("a", "red", 0, 1000).with_rect(0.0, 0.0, 4.0, 4.0),
        ClipRecord::new("b", "dim", 0, 1000).with_rect(2.0, 2.0, 4.0, 4.0),
    ]);
    let snap = t.snapshot();
    let canvas = p.compose(&snap, FrameIndex(5));
    assert_eq!(canvas.pixel(0, 0), [255, 5, 0, 255]);
    assert_eq!(canvas.pixel(3, 3), [40, 5, 0, 255]);
    assert_eq!(canvas.pixel(7, 7), BLACK);
}

#[test]
fn failing_clip_is_skipped_and_others_still_render() {
    let p = pipeline(8);
    let t = timeline(&[
        ClipRecord::new("gone", "missing", 0, 1000),
        ClipRecord::new("a", "red", 0, 1000).with_rect(0.0, 0.0, 2.0, 2.0),
    ]);
    let canvas = p.compose(&t.snapshot(), FrameIndex(0));
    assert_eq!(canvas.pixel(0, 0), [255, 0, 0, 255]);
}

#[test]
fn repeated_renders_hit_the_cache() {
    let p = pipeline(8);
    let t = timeline(&[ClipRecord::new("a", "red", 0, 1000)]);
    let snap = t.snapshot();
    let first = p.render(&snap, FrameIndex(3)).unwrap();
    let second = p.render(&snap, FrameIndex(3)).unwrap();
    assert_eq!(first, second);
    assert!(Arc::ptr_eq(&first, &second));
    let stats = p.cache_stats();
    assert_eq!((stats.hits, stats.misses, stats.len), (1, 1, 1));
}

#[test]
fn reordering_overlapping_clips_misses_the_cache() {
    let p = pipeline(8);
    let red = ClipRecord::new("a", "red", 0, 1000);
    let dim = ClipRecord::new("b", "dim", 0, 1000);
    let t = timeline(&[red.clone(), dim.clone()]);
    let before = t.snapshot();
    let dim_on_top = p.render(&before, FrameIndex(0)).unwrap();

    t.update(&[dim, red], 90, None);
    let after = t.snapshot();
    assert_eq!(before.fingerprint(), after.fingerprint());
    assert_ne!(before.paint_order(FrameIndex(0)), after.paint_order(FrameIndex(0)));

    let red_on_top = p.render(&after, FrameIndex(0)).unwrap();
    assert_eq!(p.compose(&after, FrameIndex(0)).pixel(4, 4), [255, 0, 0, 255]);
    assert_ne!(dim_on_top, red_on_top);
    assert_eq!(
        &red_on_top[..],
        &p.encoder()
            .encode(&p.compose(&after, FrameIndex(0)), None)
            .unwrap()[..]
    );
    let stats = p.cache_stats();
    assert_eq!((stats.hits, stats.misses, stats.len), (0, 2, 2));
}

#[test]
fn disabled_cache_still_renders_identical_bytes() {
    let p = pipeline(0);
    let t = timeline(&[ClipRecord::new("a", "red", 0, 1000)]);
    let snap = t.snapshot();
    let a = p.render(&snap, FrameIndex(3)).unwrap();
    let b = p.render(&snap, FrameIndex(3)).unwrap();
    assert_eq!(a, b);
    assert_eq!(p.cache_stats().len, 0);
}

#[test]
fn clear_all_caches_drops_frames_and_decoders() {
    let p = pipeline(8);
    let t = timeline(&[ClipRecord::new("a", "red", 0, 1000)]);
    p.render(&t.snapshot(), FrameIndex(0)).unwrap();
    assert_eq!(p.source().open_handles(), 1);
    p.clear_all_caches();
    assert_eq!(p.cache_stats().len, 0);
    assert_eq!(p.source().open_handles(), 0);
}
