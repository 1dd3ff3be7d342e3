use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

use crate::encode::image_codec::{DEFAULT_JPEG_QUALITY, ImageFormat};
use crate::foundation::core::{Canvas, DEFAULT_FPS, Fps};
use crate::foundation::error::{FramecastError, FramecastResult};
use crate::source::video_source::DEFAULT_MAX_OPEN_HANDLES;

/// Service configuration, loadable from JSON. Every field has a default.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Initial canvas width.
    pub canvas_width: u32,
    /// Initial canvas height.
    pub canvas_height: u32,
    /// Initial frame rate.
    pub fps: f64,
    /// Timeline length used before any clip extends it.
    pub total_frames: u64,
    /// Encoded frame format.
    pub format: ImageFormat,
    /// JPEG quality, `1..=100`.
    pub quality: u8,
    /// Bound on simultaneously open decoders.
    pub max_open_handles: usize,
    /// Bound on cached encoded frames; 0 disables the cache.
    pub frame_cache_entries: usize,
    /// Concurrent renders on the pull path.
    pub render_workers: usize,
    /// How long a pull request may wait for a render slot.
    pub queue_timeout_ms: u64,
    /// How long a pull request may wait for its render.
    pub render_timeout_ms: u64,
    /// Frames buffered per stream subscriber.
    pub subscriber_buffer: usize,
    /// Restart playback at frame 0 after the last frame.
    pub loop_playback: bool,
    /// Draw placeholder and frame-index text.
    pub overlays: bool,
    /// HTTP bind host.
    pub host: String,
    /// HTTP bind port.
    pub http_port: u16,
    /// Project file backing the timeline.
    pub project: Option<PathBuf>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1280,
            canvas_height: 720,
            fps: DEFAULT_FPS,
            total_frames: 600,
            format: ImageFormat::Jpeg,
            quality: DEFAULT_JPEG_QUALITY,
            max_open_handles: DEFAULT_MAX_OPEN_HANDLES,
            frame_cache_entries: 240,
            render_workers: 4,
            queue_timeout_ms: 2_000,
            render_timeout_ms: 5_000,
            subscriber_buffer: 4,
            loop_playback: true,
            overlays: true,
            host: "127.0.0.1".to_string(),
            http_port: 8765,
            project: None,
        }
    }
}

impl PreviewConfig {
    /// Load a JSON config file; missing fields take their defaults.
    pub fn from_path(path: &Path) -> FramecastResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Parse a JSON config document.
    pub fn from_json_str(text: &str) -> FramecastResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| FramecastError::validation(format!("invalid config: {e}")))
    }

    /// Initial canvas; invalid dimensions fall back to 1280x720.
    pub fn canvas(&self) -> Canvas {
        Canvas::new(i64::from(self.canvas_width), i64::from(self.canvas_height)).unwrap_or_else(
            |_| {
                tracing::warn!(
                    width = self.canvas_width,
                    height = self.canvas_height,
                    "invalid configured canvas, using default"
                );
                Canvas::default()
            },
        )
    }

    /// Initial frame rate; invalid rates fall back to 30.
    pub fn fps(&self) -> Fps {
        Fps::or_default(self.fps)
    }

    /// Frame pipeline options.
    pub fn pipeline_opts(&self) -> PipelineOpts {
        PipelineOpts {
            format: self.format,
            quality: self.quality,
            max_open_handles: self.max_open_handles,
            frame_cache_entries: self.frame_cache_entries,
            overlays: self.overlays,
        }
    }

    /// Pull-path pool options.
    pub fn pool_opts(&self) -> PoolOpts {
        PoolOpts {
            workers: self.render_workers,
            queue_timeout: Duration::from_millis(self.queue_timeout_ms),
            render_timeout: Duration::from_millis(self.render_timeout_ms),
        }
    }

    /// Push-path playback options.
    pub fn playback_opts(&self) -> PlaybackOpts {
        PlaybackOpts {
            subscriber_buffer: self.subscriber_buffer,
            loop_playback: self.loop_playback,
        }
    }
}

/// Options for [`crate::FramePipeline`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineOpts {
    /// Encoded frame format.
    pub format: ImageFormat,
    /// Default JPEG quality.
    pub quality: u8,
    /// Bound on simultaneously open decoders.
    pub max_open_handles: usize,
    /// Bound on cached encoded frames; 0 disables the cache.
    pub frame_cache_entries: usize,
    /// Draw text overlays.
    pub overlays: bool,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        PreviewConfig::default().pipeline_opts()
    }
}

/// Options for [`crate::RenderPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolOpts {
    /// Concurrent renders; 0 is treated as 1.
    pub workers: usize,
    /// Maximum wait for a free render slot.
    pub queue_timeout: Duration,
    /// Maximum wait for a dispatched render.
    pub render_timeout: Duration,
}

impl Default for PoolOpts {
    fn default() -> Self {
        PreviewConfig::default().pool_opts()
    }
}

/// Options for [`crate::Playback`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackOpts {
    /// Frames buffered per subscriber; 0 is treated as 1.
    pub subscriber_buffer: usize,
    /// Restart at frame 0 after the last frame instead of stopping.
    pub loop_playback: bool,
}

impl Default for PlaybackOpts {
    fn default() -> Self {
        PreviewConfig::default().playback_opts()
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
