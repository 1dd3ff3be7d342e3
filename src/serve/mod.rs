//! Delivery of rendered frames: the bounded pull pool, paced playback and the engine that
//! coordinates them.

pub(crate) mod engine;
pub(crate) mod playback;
pub(crate) mod pool;
pub(crate) mod protocol;
