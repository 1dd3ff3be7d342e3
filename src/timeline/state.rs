use std::sync::{Arc, PoisonError, RwLock};

use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::timeline::clip::{ClipDescriptor, ClipRecord};
use crate::timeline::fingerprint::{TimelineFingerprint, fingerprint_with_ranks};

/// Immutable view of the timeline used for one render.
#[derive(Clone, Debug)]
pub struct TimelineSnapshot {
    /// Output canvas size.
    pub canvas: Canvas,
    /// Frame rate the clip frame values were derived with.
    pub fps: Fps,
    /// Timeline length in frames; always covers the furthest clip end.
    pub total_frames: u64,
    /// Clips in paint order (later entries paint over earlier ones).
    pub clips: Vec<ClipDescriptor>,
    fingerprint: TimelineFingerprint,
    paint_ranks: Vec<u32>,
}

impl TimelineSnapshot {
    /// Build a snapshot, extending `total_frames` to cover every clip.
    pub fn new(canvas: Canvas, fps: Fps, total_frames: u64, clips: Vec<ClipDescriptor>) -> Self {
        let furthest = clips.iter().map(|c| c.track_range.end.0).max().unwrap_or(0);
        let total_frames = total_frames.max(furthest);
        let (fingerprint, paint_ranks) = fingerprint_with_ranks(canvas, fps, total_frames, &clips);
        Self {
            canvas,
            fps,
            total_frames,
            clips,
            fingerprint,
            paint_ranks,
        }
    }

    /// Cache key of this snapshot.
    pub fn fingerprint(&self) -> &TimelineFingerprint {
        &self.fingerprint
    }

    /// Canonical ranks of the clips active at `frame`, in paint order.
    ///
    /// The fingerprint ignores clip order; this carries it for the clips that meet at `frame`.
    pub fn paint_order(&self, frame: FrameIndex) -> Vec<u32> {
        self.clips
            .iter()
            .zip(&self.paint_ranks)
            .filter(|(c, _)| c.track_range.contains(frame))
            .map(|(_, rank)| *rank)
            .collect()
    }

    /// Clips active at `frame`, in paint order, with the source frame each one samples.
    pub fn active_clips(
        &self,
        frame: FrameIndex,
    ) -> impl Iterator<Item = (&ClipDescriptor, u64)> + '_ {
        self.clips
            .iter()
            .filter_map(move |c| c.source_frame_at(frame).map(|sf| (c, sf)))
    }

    /// Clamp `frame` into `[0, total_frames - 1]`.
    pub fn clamp_frame(&self, frame: u64) -> FrameIndex {
        FrameIndex(frame.min(self.total_frames.saturating_sub(1)))
    }
}

/// Outcome of a bulk clip replacement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Clips that entered the timeline.
    pub accepted: usize,
    /// Records dropped because they were invalid.
    pub rejected: usize,
}

/// Shared, swap-on-write timeline state.
///
/// Writers build a complete new [`TimelineSnapshot`] and swap it in; readers never observe a
/// half-applied update.
#[derive(Debug)]
pub struct TimelineState {
    current: RwLock<Arc<TimelineSnapshot>>,
}

impl TimelineState {
    /// Empty timeline.
    pub fn new(canvas: Canvas, fps: Fps, total_frames: u64) -> Self {
        Self {
            current: RwLock::new(Arc::new(TimelineSnapshot::new(
                canvas,
                fps,
                total_frames,
                Vec::new(),
            ))),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<TimelineSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Fingerprint of the current snapshot.
    pub fn fingerprint(&self) -> TimelineFingerprint {
        self.snapshot().fingerprint().clone()
    }

    /// Replace clips and total frame count; optionally replace the frame rate.
    ///
    /// A supplied `fps` that is not finite and positive resets the rate to the default. Invalid
    /// records are logged and skipped. The canvas is left untouched.
    pub fn update(
        &self,
        records: &[ClipRecord],
        total_frames: u64,
        fps: Option<f64>,
    ) -> UpdateSummary {
        self.replace(None, records, total_frames, fps)
    }

    /// Swap in a whole new timeline in one step: clips, total frame count, and optionally the
    /// canvas and frame rate.
    ///
    /// Readers see either the previous snapshot or the complete new one, never a mix.
    pub fn replace(
        &self,
        canvas: Option<Canvas>,
        records: &[ClipRecord],
        total_frames: u64,
        fps: Option<f64>,
    ) -> UpdateSummary {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let fps = fps.map(Fps::or_default).unwrap_or(current.fps);
        let canvas = canvas.unwrap_or(current.canvas);

        let mut summary = UpdateSummary::default();
        let mut clips = Vec::with_capacity(records.len());
        for record in records {
            match ClipDescriptor::from_record(record, fps) {
                Ok(c) => {
                    clips.push(c);
                    summary.accepted += 1;
                }
                Err(e) => {
                    tracing::warn!(clip = %record.clip_id, error = %e, "skipping clip");
                    summary.rejected += 1;
                }
            }
        }

        let next = TimelineSnapshot::new(canvas, fps, total_frames, clips);
        tracing::debug!(
            clips = next.clips.len(),
            total_frames = next.total_frames,
            fps = next.fps.as_f64(),
            width = canvas.width,
            height = canvas.height,
            fingerprint = %next.fingerprint().to_hex(),
            "timeline updated"
        );
        *current = Arc::new(next);
        summary
    }

    /// Change the canvas size. Returns `true` when the dimensions changed.
    ///
    /// Non-positive dimensions are rejected and leave the state untouched.
    pub fn update_canvas(&self, width: i64, height: i64) -> bool {
        let Ok(canvas) = Canvas::new(width, height) else {
            tracing::warn!(width, height, "ignoring invalid canvas size");
            return false;
        };
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.canvas == canvas {
            return false;
        }
        let next = TimelineSnapshot::new(
            canvas,
            current.fps,
            current.total_frames,
            current.clips.clone(),
        );
        *current = Arc::new(next);
        tracing::info!(width, height, "canvas resized");
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/state.rs"]
mod tests;
