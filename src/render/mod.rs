//! Per-frame rendering: transform, composite, overlay and the cached frame pipeline.

pub(crate) mod composite;
pub(crate) mod frame;
pub(crate) mod overlay;
pub(crate) mod pipeline;
pub(crate) mod transform;
