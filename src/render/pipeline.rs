use std::sync::Arc;

use rayon::prelude::*;

use crate::cache::bounded::{BoundedCache, CacheStats};
use crate::config::PipelineOpts;
use crate::encode::image_codec::FrameEncoder;
use crate::foundation::core::FrameIndex;
use crate::render::composite::composite_onto;
use crate::render::frame::{BLACK, FrameRGBA, blank_canvas};
use crate::render::overlay::{Overlay, draw_overlay};
use crate::render::transform::{PlacedFrame, transform};
use crate::source::video_source::VideoSource;
use crate::timeline::fingerprint::TimelineFingerprint;
use crate::timeline::state::TimelineSnapshot;

/// Encoded frame bytes, shared between the cache and every consumer.
pub type EncodedFrame = Arc<[u8]>;

/// `(fingerprint, frame, canonical ranks of the active clips in paint order)`
type FrameKey = (TimelineFingerprint, u64, Vec<u32>);

/// Turns a timeline snapshot and frame index into encoded bytes.
///
/// Final frames are cached under the snapshot fingerprint, the frame and the paint order of the
/// clips active there, so any timeline, canvas or stacking change misses the cache without an
/// explicit invalidation.
pub struct FramePipeline {
    source: Arc<VideoSource>,
    encoder: FrameEncoder,
    cache: BoundedCache<FrameKey, EncodedFrame>,
    overlays: bool,
}

impl FramePipeline {
    /// Build a pipeline reading through `source`.
    pub fn new(source: Arc<VideoSource>, opts: &PipelineOpts) -> Self {
        Self {
            source,
            encoder: FrameEncoder::new(opts.format, opts.quality),
            cache: BoundedCache::new(opts.frame_cache_entries),
            overlays: opts.overlays,
        }
    }

    /// Decoder access shared with the rest of the service.
    pub fn source(&self) -> &Arc<VideoSource> {
        &self.source
    }

    /// Encoder used for final frames.
    pub fn encoder(&self) -> &FrameEncoder {
        &self.encoder
    }

    /// Render and encode `frame`, serving repeats from the cache.
    ///
    /// Returns `None` when encoding fails.
    pub fn render(&self, snapshot: &TimelineSnapshot, frame: FrameIndex) -> Option<EncodedFrame> {
        let key = (
            snapshot.fingerprint().clone(),
            frame.0,
            snapshot.paint_order(frame),
        );
        if let Some(hit) = self.cache.get(&key) {
            tracing::trace!(frame = frame.0, "frame cache hit");
            return Some(hit);
        }

        let canvas = self.compose(snapshot, frame);
        match self.encoder.encode(&canvas, None) {
            Ok(bytes) => {
                let bytes: EncodedFrame = bytes.into();
                self.cache.insert(key, Arc::clone(&bytes));
                Some(bytes)
            }
            Err(e) => {
                tracing::error!(frame = frame.0, error = %e, "failed to encode frame");
                None
            }
        }
    }

    /// Composite `frame` without encoding or caching.
    pub fn compose(&self, snapshot: &TimelineSnapshot, frame: FrameIndex) -> FrameRGBA {
        let (w, h) = (snapshot.canvas.width, snapshot.canvas.height);
        let mut canvas = blank_canvas(w, h, BLACK);

        if snapshot.clips.is_empty() {
            self.stamp(&mut canvas, Overlay::NoClips(frame));
            return canvas;
        }

        let active: Vec<_> = snapshot.active_clips(frame).collect();
        let placed: Vec<PlacedFrame> = active
            .par_iter()
            .filter_map(|(clip, source_frame)| {
                match self.source.get_frame(clip.source(), *source_frame) {
                    Ok(raw) => Some(transform(raw, clip, w, h)),
                    Err(e) => {
                        tracing::warn!(
                            frame = frame.0,
                            clip = %clip.id,
                            path = %clip.source_path,
                            source_frame,
                            error = %e,
                            "skipping clip"
                        );
                        None
                    }
                }
            })
            .collect();

        if placed.is_empty() {
            self.stamp(&mut canvas, Overlay::NoVisibleClips(frame));
            return canvas;
        }

        composite_onto(&mut canvas, &placed);
        self.stamp(&mut canvas, Overlay::FrameStamp(frame));
        tracing::debug!(frame = frame.0, clips = placed.len(), "composited frame");
        canvas
    }

    fn stamp(&self, canvas: &mut FrameRGBA, overlay: Overlay) {
        if !self.overlays {
            return;
        }
        if let Err(e) = draw_overlay(canvas, overlay) {
            tracing::debug!(error = %e, "overlay skipped");
        }
    }

    /// Drop every cached frame and release all decoders.
    pub fn clear_all_caches(&self) {
        self.cache.clear();
        self.source.evict_all();
        tracing::info!("cleared frame cache and decoders");
    }

    /// Frame cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
