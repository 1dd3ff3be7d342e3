use std::time::Duration;

use crate::foundation::error::{FramecastError, FramecastResult};

/// Frame rate used whenever a timeline supplies a missing, zero or non-finite rate.
pub const DEFAULT_FPS: f64 = 30.0;

/// Slowest accepted frame rate; smaller positive rates clamp up to it.
pub const MIN_FPS: f64 = 0.001;

/// Fastest accepted frame rate; larger rates clamp down to it.
pub const MAX_FPS: f64 = 1000.0;

/// Largest accepted canvas edge in pixels.
pub const MAX_CANVAS_EDGE: u32 = 16_384;

/// Absolute 0-based frame index in timeline space.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open frame range `[start, end)` in timeline space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// Inclusive range start.
    pub start: FrameIndex,
    /// Exclusive range end.
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    /// Create a validated, non-empty range with `start < end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> FramecastResult<Self> {
        if start.0 >= end.0 {
            return Err(FramecastError::validation(format!(
                "frame range [{}, {}) is empty",
                start.0, end.0
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of frames contained in the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Return `true` when `f` is inside `[start, end)`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }

    /// Offset of `f` from the range start, or `None` when `f` lies outside the range.
    pub fn offset_of(self, f: FrameIndex) -> Option<u64> {
        self.contains(f).then(|| f.0 - self.start.0)
    }
}

/// Timeline frame rate in frames per second.
///
/// Always finite and within `[MIN_FPS, MAX_FPS]`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Fps(f64);

impl Fps {
    /// Create a validated frame rate, clamping positive rates into `[MIN_FPS, MAX_FPS]`.
    pub fn new(fps: f64) -> FramecastResult<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(FramecastError::validation(format!(
                "fps must be finite and > 0, got {fps}"
            )));
        }
        Ok(Self(fps.clamp(MIN_FPS, MAX_FPS)))
    }

    /// Accept `fps` when valid, otherwise fall back to [`DEFAULT_FPS`].
    pub fn or_default(fps: f64) -> Self {
        Self::new(fps).unwrap_or_default()
    }

    /// Floating-point frames per second.
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Convert a millisecond timestamp into a frame number: `round(ms * fps / 1000)`.
    ///
    /// Negative timestamps map to frame 0.
    pub fn ms_to_frames(self, ms: i64) -> u64 {
        let frames = (ms as f64) * self.0 / 1000.0;
        frames.round().max(0.0) as u64
    }

    /// Wall-clock duration of one frame.
    pub fn frame_interval(self) -> Duration {
        Duration::from_secs_f64(1.0 / self.0)
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self(DEFAULT_FPS)
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create validated canvas dimensions.
    ///
    /// Non-positive edges and edges above [`MAX_CANVAS_EDGE`] are rejected.
    pub fn new(width: i64, height: i64) -> FramecastResult<Self> {
        let max = i64::from(MAX_CANVAS_EDGE);
        if width <= 0 || height <= 0 || width > max || height > max {
            return Err(FramecastError::validation(format!(
                "invalid canvas dimensions {width}x{height}"
            )));
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
        })
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
