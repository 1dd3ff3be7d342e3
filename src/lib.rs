//! Framecast renders a compositing timeline into individually addressable frames.
//!
//! A timeline places video clips on a canvas with independent time ranges, placement and
//! flips. The crate maps a frame index to the active source frames, decodes and composites
//! them, encodes the result and caches it under a canonical timeline fingerprint.
//!
//! - Build a [`PreviewEngine`] from a [`PreviewConfig`] and a [`TimelineSource`]
//! - Pull single frames with [`PreviewEngine::request_frame`]
//! - Push paced frames to a [`Subscription`] with [`PreviewEngine::play`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod cache;
/// Service configuration.
pub mod config;
pub(crate) mod encode;
/// Persisted timeline access.
pub mod project;
pub(crate) mod render;
pub(crate) mod serve;
pub(crate) mod source;
pub(crate) mod timeline;

pub use crate::foundation::core::{
    Canvas, DEFAULT_FPS, Fps, FrameIndex, FrameRange, MAX_CANVAS_EDGE, MAX_FPS, MIN_FPS,
};
pub use crate::foundation::error::{FramecastError, FramecastResult};

pub use crate::cache::bounded::{BoundedCache, CacheStats};
pub use crate::config::{PipelineOpts, PlaybackOpts, PoolOpts, PreviewConfig};
pub use crate::encode::image_codec::{DEFAULT_JPEG_QUALITY, FrameEncoder, ImageFormat};
pub use crate::project::{
    CanvasSize, JsonTimelineSource, StaticTimelineSource, TimelineDocument, TimelineSource,
};
pub use crate::render::composite::{PremulRgba8, composite, over};
pub use crate::render::frame::{BLACK, FrameRGBA, blank_canvas};
pub use crate::render::overlay::{Overlay, draw_overlay};
pub use crate::render::pipeline::{EncodedFrame, FramePipeline};
pub use crate::render::transform::{MAX_TARGET_EDGE, PlacedFrame, transform};
pub use crate::serve::engine::{EngineStats, PreviewEngine};
pub use crate::serve::playback::{
    Playback, PlaybackStats, PlaybackTarget, StreamFrame, Subscription,
};
pub use crate::serve::pool::{RenderPool, ServeError};
pub use crate::serve::protocol::{Command, PlaybackState};
pub use crate::source::handle::{DecodeHandle, MediaOpener, SourceOpener, SourceProperties};
pub use crate::source::video_source::{DEFAULT_MAX_OPEN_HANDLES, VideoSource};
pub use crate::timeline::clip::{ClipDescriptor, ClipMetadata, ClipRecord, Flip, Placement};
pub use crate::timeline::fingerprint::TimelineFingerprint;
pub use crate::timeline::state::{TimelineSnapshot, TimelineState, UpdateSummary};
