use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::foundation::core::{Fps, FrameIndex, FrameRange};
use crate::foundation::error::{FramecastError, FramecastResult};

/// Mirror mode applied to a clip's frame after resizing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flip {
    /// Frame is drawn as decoded.
    #[default]
    None,
    /// Mirror columns.
    Horizontal,
    /// Mirror rows.
    Vertical,
    /// Mirror columns and rows.
    Both,
}

impl Flip {
    pub(crate) fn tag(self) -> u8 {
        match self {
            Flip::None => 0,
            Flip::Horizontal => 1,
            Flip::Vertical => 2,
            Flip::Both => 3,
        }
    }

    /// Whether columns are mirrored.
    pub fn mirrors_columns(self) -> bool {
        matches!(self, Flip::Horizontal | Flip::Both)
    }

    /// Whether rows are mirrored.
    pub fn mirrors_rows(self) -> bool {
        matches!(self, Flip::Vertical | Flip::Both)
    }
}

/// Canvas-space placement override for a clip.
///
/// Each field overrides the fit-and-center default independently; `None` keeps the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    /// Left edge in canvas pixels.
    pub left: Option<f64>,
    /// Top edge in canvas pixels.
    pub top: Option<f64>,
    /// Target width in canvas pixels (>= 1 after sanitizing).
    pub width: Option<f64>,
    /// Target height in canvas pixels (>= 1 after sanitizing).
    pub height: Option<f64>,
}

impl Placement {
    /// Full explicit rectangle.
    pub fn rect(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left: Some(left),
            top: Some(top),
            width: Some(width),
            height: Some(height),
        }
    }

    /// `true` when no field overrides the default placement.
    pub fn is_default(&self) -> bool {
        self.left.is_none() && self.top.is_none() && self.width.is_none() && self.height.is_none()
    }

    /// Drop non-finite values and clamp supplied sizes to at least one pixel.
    fn sanitized(self) -> Self {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        let size = |v: Option<f64>| finite(v).map(|x| x.max(1.0));
        Self {
            left: finite(self.left),
            top: finite(self.top),
            width: size(self.width),
            height: size(self.height),
        }
    }
}

/// Free-form clip metadata as sent by editors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClipMetadata {
    /// Explicit placement rectangle.
    pub preview_rect: Option<Placement>,
    /// Mirror mode.
    pub flip: Option<Flip>,
}

/// Wire/persistence form of a clip, in milliseconds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClipRecord {
    /// Stable clip identifier (string or numeric database id).
    #[serde(alias = "databaseId", deserialize_with = "string_or_number")]
    pub clip_id: String,
    /// Source media path.
    pub source_path: String,
    /// Track-time start (inclusive).
    pub start_time_on_track_ms: i64,
    /// Track-time end (exclusive).
    pub end_time_on_track_ms: i64,
    /// Offset into the source where the clip starts.
    pub start_time_in_source_ms: i64,
    /// Optional end of the used source range.
    pub end_time_in_source_ms: Option<i64>,
    /// Placement and flip.
    pub metadata: ClipMetadata,
}

impl ClipRecord {
    /// Record covering `[start_ms, end_ms)` on the track, reading the source from its start.
    pub fn new(
        clip_id: impl Into<String>,
        source_path: impl Into<String>,
        start_ms: i64,
        end_ms: i64,
    ) -> Self {
        Self {
            clip_id: clip_id.into(),
            source_path: source_path.into(),
            start_time_on_track_ms: start_ms,
            end_time_on_track_ms: end_ms,
            ..Self::default()
        }
    }

    /// Start reading the source `ms` milliseconds in.
    pub fn with_source_offset(mut self, ms: i64) -> Self {
        self.start_time_in_source_ms = ms;
        self
    }

    /// Place the clip at an explicit canvas rectangle.
    pub fn with_rect(mut self, left: f64, top: f64, width: f64, height: f64) -> Self {
        self.metadata.preview_rect = Some(Placement::rect(left, top, width, height));
        self
    }

    /// Set a partial placement override.
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.metadata.preview_rect = Some(placement);
        self
    }

    /// Mirror the clip.
    pub fn with_flip(mut self, flip: Flip) -> Self {
        self.metadata.flip = Some(flip);
        self
    }
}

fn string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(de)? {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// A clip resolved into the frame domain of one timeline.
///
/// Built once when the clip enters the timeline and never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipDescriptor {
    /// Stable clip identifier, possibly empty.
    pub id: String,
    /// Source media path.
    pub source_path: String,
    /// Track-time start in ms (inclusive).
    pub track_start_ms: i64,
    /// Track-time end in ms (exclusive).
    pub track_end_ms: i64,
    /// Source offset in ms.
    pub source_start_ms: i64,
    /// Source end in ms, when known.
    pub source_end_ms: Option<i64>,
    /// Active track frames `[track_start_frame, track_end_frame)`.
    pub track_range: FrameRange,
    /// First source frame shown at `track_range.start`.
    pub source_start_frame: u64,
    /// Canvas placement override.
    pub placement: Placement,
    /// Mirror mode.
    pub flip: Flip,
}

impl ClipDescriptor {
    /// Resolve `record` into frames at `fps`.
    ///
    /// Fails when the record has no source path or covers no whole frame.
    pub fn from_record(record: &ClipRecord, fps: Fps) -> FramecastResult<Self> {
        if record.source_path.trim().is_empty() {
            return Err(FramecastError::validation(format!(
                "clip '{}' has no source path",
                record.clip_id
            )));
        }
        let start = fps.ms_to_frames(record.start_time_on_track_ms);
        let end = fps.ms_to_frames(record.end_time_on_track_ms);
        let track_range = FrameRange::new(FrameIndex(start), FrameIndex(end)).map_err(|_| {
            FramecastError::validation(format!(
                "clip '{}' track range {}..{}ms covers no frames at {} fps",
                record.clip_id,
                record.start_time_on_track_ms,
                record.end_time_on_track_ms,
                fps.as_f64()
            ))
        })?;

        Ok(Self {
            id: record.clip_id.clone(),
            source_path: record.source_path.clone(),
            track_start_ms: record.start_time_on_track_ms,
            track_end_ms: record.end_time_on_track_ms,
            source_start_ms: record.start_time_in_source_ms,
            source_end_ms: record.end_time_in_source_ms,
            track_range,
            source_start_frame: fps.ms_to_frames(record.start_time_in_source_ms),
            placement: record
                .metadata
                .preview_rect
                .map(Placement::sanitized)
                .unwrap_or_default(),
            flip: record.metadata.flip.unwrap_or_default(),
        })
    }

    /// Source path as a filesystem path.
    pub fn source(&self) -> &Path {
        Path::new(&self.source_path)
    }

    /// Whether the clip contributes to timeline frame `frame`.
    pub fn is_active(&self, frame: FrameIndex) -> bool {
        self.track_range.contains(frame)
    }

    /// Source frame sampled at timeline frame `frame`, or `None` when the clip is inactive.
    pub fn source_frame_at(&self, frame: FrameIndex) -> Option<u64> {
        self.track_range
            .offset_of(frame)
            .map(|offset| self.source_start_frame + offset)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/clip.rs"]
mod tests;
