//! Still-image encoding of composited canvases.
//!
//! Output is deterministic: identical canvases and settings produce identical bytes.

pub(crate) mod image_codec;
