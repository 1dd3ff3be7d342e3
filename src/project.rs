//! Persisted timeline access.
//!
//! The engine pulls its timeline through [`TimelineSource`] on `refresh`, so the storage
//! behind it (a project file, an embedded document, an external store) stays swappable.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{FramecastError, FramecastResult};
use crate::timeline::clip::ClipRecord;

/// Canvas size as written in a project document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanvasSize {
    /// Width in pixels.
    pub width: i64,
    /// Height in pixels.
    pub height: i64,
}

/// A persisted timeline.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineDocument {
    /// Clip records in paint order.
    pub clips: Vec<ClipRecord>,
    /// Timeline length; the engine default applies when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u64>,
    /// Frame rate; the current rate is kept when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    /// Canvas; the current canvas is kept when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas: Option<CanvasSize>,
}

impl TimelineDocument {
    /// Parse a project JSON document.
    pub fn from_json_str(text: &str) -> FramecastResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| FramecastError::validation(format!("invalid project document: {e}")))
    }
}

/// Where the engine reads the persisted timeline from.
pub trait TimelineSource: Send {
    /// Load the current document.
    fn load(&mut self) -> FramecastResult<TimelineDocument>;
}

/// Project file on disk, re-read on every load.
#[derive(Clone, Debug)]
pub struct JsonTimelineSource {
    path: PathBuf,
}

impl JsonTimelineSource {
    /// Source reading `path`; nothing is touched until the first load.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Project file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TimelineSource for JsonTimelineSource {
    fn load(&mut self) -> FramecastResult<TimelineDocument> {
        if !self.path.exists() {
            return Err(FramecastError::not_found(format!(
                "project file '{}' does not exist",
                self.path.display()
            )));
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read project '{}'", self.path.display()))?;
        let doc = TimelineDocument::from_json_str(&text)?;
        tracing::debug!(
            path = %self.path.display(),
            clips = doc.clips.len(),
            "loaded project"
        );
        Ok(doc)
    }
}

/// In-memory document, for embedding and tests.
#[derive(Clone, Debug, Default)]
pub struct StaticTimelineSource {
    doc: TimelineDocument,
}

impl StaticTimelineSource {
    /// Source returning `doc` until replaced.
    pub fn new(doc: TimelineDocument) -> Self {
        Self { doc }
    }

    /// Replace the document returned by the next load.
    pub fn set(&mut self, doc: TimelineDocument) {
        self.doc = doc;
    }
}

impl TimelineSource for StaticTimelineSource {
    fn load(&mut self) -> FramecastResult<TimelineDocument> {
        Ok(self.doc.clone())
    }
}

#[cfg(test)]
#[path = "../tests/unit/project.rs"]
mod tests;
