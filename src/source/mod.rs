//! Source media access: decoder handles and the LRU-bounded [`VideoSource`](video_source::VideoSource).

pub(crate) mod ffmpeg;
pub(crate) mod handle;
pub(crate) mod still;
pub(crate) mod video_source;
