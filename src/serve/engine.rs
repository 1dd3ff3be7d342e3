use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::cache::bounded::CacheStats;
use crate::config::PreviewConfig;
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::FramecastResult;
use crate::project::TimelineSource;
use crate::render::frame::FrameRGBA;
use crate::render::pipeline::{EncodedFrame, FramePipeline};
use crate::serve::playback::{Playback, PlaybackStats, PlaybackTarget, Subscription};
use crate::serve::pool::{RenderPool, ServeError};
use crate::serve::protocol::{Command, PlaybackState};
use crate::source::handle::{MediaOpener, SourceOpener, SourceProperties};
use crate::source::video_source::VideoSource;
use crate::timeline::clip::ClipRecord;
use crate::timeline::state::{TimelineSnapshot, TimelineState, UpdateSummary};

struct EngineCore {
    state: TimelineState,
    pipeline: FramePipeline,
}

impl PlaybackTarget for EngineCore {
    fn timing(&self) -> (u64, Fps) {
        let snapshot = self.state.snapshot();
        (snapshot.total_frames, snapshot.fps)
    }

    fn render_frame(&self, frame: FrameIndex) -> Option<EncodedFrame> {
        let snapshot = self.state.snapshot();
        self.pipeline.render(&snapshot, frame)
    }
}

/// Counters across the whole service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct EngineStats {
    /// Final-frame cache counters.
    pub cache: CacheStats,
    /// Push-path counters.
    pub playback: PlaybackStats,
    /// Decoders currently open.
    pub open_handles: usize,
    /// Pull-path renders currently holding a slot.
    pub renders_in_flight: usize,
}

/// Coordinator owning timeline mutation, rendering and both delivery paths.
///
/// Readers always work on an immutable [`TimelineSnapshot`]; mutations swap in a new one, and
/// cached frames of older snapshots stop matching through the fingerprint.
pub struct PreviewEngine {
    core: Arc<EngineCore>,
    timeline_source: Mutex<Box<dyn TimelineSource>>,
    pool: Arc<RenderPool>,
    playback: Playback,
    default_total: u64,
}

impl PreviewEngine {
    /// Build an engine decoding through [`MediaOpener`] and load the initial timeline.
    pub fn new(config: &PreviewConfig, source: Box<dyn TimelineSource>) -> FramecastResult<Self> {
        Self::with_opener(config, source, Arc::new(MediaOpener))
    }

    /// Build an engine with a custom decoder backend and load the initial timeline.
    ///
    /// A failing initial load is logged and leaves the configured empty timeline in place.
    pub fn with_opener(
        config: &PreviewConfig,
        source: Box<dyn TimelineSource>,
        opener: Arc<dyn SourceOpener>,
    ) -> FramecastResult<Self> {
        let opts = config.pipeline_opts();
        let video = Arc::new(VideoSource::new(opener, opts.max_open_handles));
        let core = Arc::new(EngineCore {
            state: TimelineState::new(config.canvas(), config.fps(), config.total_frames),
            pipeline: FramePipeline::new(video, &opts),
        });
        let pool = Arc::new(RenderPool::new(config.pool_opts())?);
        let target: Arc<dyn PlaybackTarget> = core.clone();
        let playback = Playback::new(target, Arc::clone(&pool), config.playback_opts())?;

        let engine = Self {
            core,
            timeline_source: Mutex::new(source),
            pool,
            playback,
            default_total: config.total_frames,
        };
        let _ = engine.refresh();
        Ok(engine)
    }

    /// Current immutable timeline.
    pub fn snapshot(&self) -> Arc<TimelineSnapshot> {
        self.core.state.snapshot()
    }

    /// Render frame `index` on the calling thread, through the frame cache.
    pub fn render(&self, index: u64) -> Option<EncodedFrame> {
        self.core.render_frame(FrameIndex(index))
    }

    /// Composite frame `index` without encoding.
    pub fn compose(&self, index: u64) -> FrameRGBA {
        self.core
            .pipeline
            .compose(&self.snapshot(), FrameIndex(index))
    }

    /// Render frame `index` on the bounded pool (pull path).
    pub fn request_frame(&self, index: u64) -> Result<EncodedFrame, ServeError> {
        let core = Arc::clone(&self.core);
        let snapshot = self.snapshot();
        let result = self
            .pool
            .request(move || core.pipeline.render(&snapshot, FrameIndex(index)));
        if let Err(e) = &result {
            tracing::warn!(frame = index, error = %e, "frame request failed");
        }
        result
    }

    /// Resize the canvas. Returns `true` when the dimensions changed.
    pub fn set_canvas(&self, width: i64, height: i64) -> bool {
        let changed = self.core.state.update_canvas(width, height);
        if changed {
            self.show_current_if_paused();
        }
        changed
    }

    /// Replace the clip list. `total_frames` defaults to the configured length.
    pub fn update_timeline(
        &self,
        records: &[ClipRecord],
        total_frames: Option<u64>,
        fps: Option<f64>,
    ) -> UpdateSummary {
        self.replace_timeline(None, records, total_frames, fps)
    }

    /// Replace the timeline with the persisted document.
    ///
    /// The document's canvas and clips land in one snapshot swap. On a load failure the
    /// previous timeline is kept; an invalid document canvas keeps the current canvas.
    pub fn refresh(&self) -> FramecastResult<UpdateSummary> {
        let loaded = self
            .timeline_source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .load();
        let doc = match loaded {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(error = %e, "failed to load timeline, keeping previous state");
                return Err(e);
            }
        };
        let canvas = doc.canvas.and_then(|c| match Canvas::new(c.width, c.height) {
            Ok(canvas) => Some(canvas),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring invalid project canvas");
                None
            }
        });
        Ok(self.replace_timeline(canvas, &doc.clips, doc.total_frames, doc.fps))
    }

    fn replace_timeline(
        &self,
        canvas: Option<Canvas>,
        records: &[ClipRecord],
        total_frames: Option<u64>,
        fps: Option<f64>,
    ) -> UpdateSummary {
        let total = total_frames.unwrap_or(self.default_total);
        let summary = self.core.state.replace(canvas, records, total, fps);
        tracing::info!(
            accepted = summary.accepted,
            rejected = summary.rejected,
            "timeline replaced"
        );
        self.show_current_if_paused();
        summary
    }

    /// Start paced playback from the current frame.
    pub fn play(&self) {
        self.playback.play();
    }

    /// Pause paced playback.
    pub fn pause(&self) {
        self.playback.pause();
    }

    /// Pause, move to `index` (clamped to the timeline) and push that frame to subscribers.
    pub fn seek(&self, index: u64) -> FrameIndex {
        let total = self.snapshot().total_frames;
        let target = self.playback.seek(index, total);
        self.push_frame(target);
        target
    }

    /// Subscribe to pushed frames.
    pub fn subscribe(&self) -> Subscription {
        self.playback.subscribe()
    }

    /// Properties of the source at `path`.
    pub fn media_info(&self, path: &Path) -> FramecastResult<SourceProperties> {
        self.core.pipeline.source().get_properties(path)
    }

    /// Apply a viewer command and report the resulting playback state.
    pub fn handle_command(&self, command: Command) -> FramecastResult<PlaybackState> {
        tracing::debug!(?command, "handling command");
        match command {
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::Seek(index) => {
                self.seek(index);
            }
            Command::Canvas { width, height } => {
                Canvas::new(width, height)?;
                self.set_canvas(width, height);
            }
            Command::Clips {
                records,
                total_frames,
                fps,
            } => {
                self.update_timeline(&records, total_frames, fps);
            }
            Command::Refresh => {
                self.refresh()?;
            }
        }
        Ok(self.playback_state())
    }

    /// Parse and apply a text command.
    pub fn handle_text(&self, text: &str) -> FramecastResult<PlaybackState> {
        self.handle_command(Command::parse(text)?)
    }

    /// Playing flag, position and timing.
    pub fn playback_state(&self) -> PlaybackState {
        let snapshot = self.snapshot();
        PlaybackState {
            playing: self.playback.is_playing(),
            current_frame: self.playback.current_frame(),
            total_frames: snapshot.total_frames,
            fps: snapshot.fps.as_f64(),
        }
    }

    /// Drop cached frames and open decoders.
    pub fn clear_all_caches(&self) {
        self.core.pipeline.clear_all_caches();
    }

    /// Cache, playback, decoder and pool counters.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            cache: self.core.pipeline.cache_stats(),
            playback: self.playback.stats(),
            open_handles: self.core.pipeline.source().open_handles(),
            renders_in_flight: self.pool.in_flight(),
        }
    }

    /// Refuse new pull requests and stop playback. Idempotent.
    pub fn shutdown(&self) {
        if !self.pool.is_closed() {
            tracing::info!("shutting down preview engine");
        }
        self.pool.close();
        self.playback.stop();
    }

    fn show_current_if_paused(&self) {
        if self.playback.is_playing() || self.playback.subscriber_count() == 0 {
            return;
        }
        let total = self.snapshot().total_frames;
        let current = self.playback.current_frame().min(total.saturating_sub(1));
        self.push_frame(FrameIndex(current));
    }

    fn push_frame(&self, index: FrameIndex) {
        if self.playback.subscriber_count() == 0 {
            return;
        }
        match self.request_frame(index.0) {
            Ok(bytes) => self.playback.push(index, bytes),
            Err(e) => tracing::debug!(frame = index.0, error = %e, "frame not pushed"),
        }
    }
}

impl Drop for PreviewEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/serve/engine.rs"]
mod tests;
