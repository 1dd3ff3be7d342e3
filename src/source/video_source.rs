use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;

use crate::foundation::error::{FramecastError, FramecastResult};
use crate::render::frame::FrameRGBA;
use crate::source::handle::{DecodeHandle, MediaOpener, SourceOpener, SourceProperties};

/// Default bound on simultaneously open decoders.
pub const DEFAULT_MAX_OPEN_HANDLES: usize = 32;

/// One cache slot: a lazily opened decoder behind its own lock.
struct HandleSlot {
    handle: Mutex<Option<Box<dyn DecodeHandle>>>,
}

impl HandleSlot {
    fn empty() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn DecodeHandle>>> {
        match self.handle.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                // A decoder panicked mid-read; its state is unknown, reopen on next use.
                let mut g = poisoned.into_inner();
                *g = None;
                self.handle.clear_poison();
                g
            }
        }
    }
}

/// Frame access over a bounded, LRU-managed set of decoders.
///
/// Each path maps to at most one decoder. Seek+read on a decoder is serialized by the slot's
/// mutex, so concurrent callers for the same path take turns while other paths proceed in
/// parallel. An evicted decoder is released once the last in-flight user drops it.
pub struct VideoSource {
    opener: Arc<dyn SourceOpener>,
    slots: Mutex<LruCache<PathBuf, Arc<HandleSlot>>>,
}

impl Default for VideoSource {
    fn default() -> Self {
        Self::new(Arc::new(MediaOpener), DEFAULT_MAX_OPEN_HANDLES)
    }
}

impl VideoSource {
    /// Build with a custom opener. A capacity of 0 is treated as 1.
    pub fn new(opener: Arc<dyn SourceOpener>, max_open_handles: usize) -> Self {
        let cap = NonZeroUsize::new(max_open_handles.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            opener,
            slots: Mutex::new(LruCache::new(cap)),
        }
    }

    fn slots(&self) -> MutexGuard<'_, LruCache<PathBuf, Arc<HandleSlot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, path: &Path) -> Arc<HandleSlot> {
        let evicted;
        let slot = {
            let mut slots = self.slots();
            if let Some(s) = slots.get(path) {
                return Arc::clone(s);
            }
            let s = Arc::new(HandleSlot::empty());
            evicted = slots.push(path.to_path_buf(), Arc::clone(&s));
            s
        };
        if let Some((old, _)) = &evicted {
            tracing::debug!(path = %old.display(), "evicting decoder");
        }
        drop(evicted);
        slot
    }

    fn forget(&self, path: &Path, slot: &Arc<HandleSlot>) {
        let removed = {
            let mut slots = self.slots();
            match slots.peek(path) {
                Some(s) if Arc::ptr_eq(s, slot) => slots.pop(path),
                _ => None,
            }
        };
        drop(removed);
    }

    fn with_handle<R>(
        &self,
        path: &Path,
        f: impl FnOnce(&mut dyn DecodeHandle) -> FramecastResult<R>,
    ) -> FramecastResult<R> {
        let slot = self.slot(path);
        let mut guard = slot.lock();
        if guard.is_none() {
            match self.opener.open(path) {
                Ok(h) => {
                    tracing::debug!(path = %path.display(), "opened source");
                    *guard = Some(h);
                }
                Err(e) => {
                    drop(guard);
                    self.forget(path, &slot);
                    return Err(e);
                }
            }
        }
        let handle = guard
            .as_mut()
            .ok_or_else(|| FramecastError::decode(format!("'{}' is not open", path.display())))?;
        f(handle.as_mut())
    }

    /// Decode frame `source_frame` of `path`.
    ///
    /// Indices past the end clamp to the last frame when the source reports a frame count.
    pub fn get_frame(&self, path: &Path, source_frame: u64) -> FramecastResult<FrameRGBA> {
        self.with_handle(path, |h| {
            let index = h.properties().clamp_index(source_frame);
            let frame = h.read_frame(index)?;
            if frame.is_degenerate() {
                return Err(FramecastError::decode(format!(
                    "decoder for '{}' returned an empty frame",
                    path.display()
                )));
            }
            Ok(frame)
        })
    }

    /// Properties of `path`, opening it if needed.
    pub fn get_properties(&self, path: &Path) -> FramecastResult<SourceProperties> {
        self.with_handle(path, |h| Ok(h.properties()))
    }

    /// Release every open decoder.
    pub fn evict_all(&self) {
        let drained: Vec<_> = {
            let mut slots = self.slots();
            std::iter::from_fn(|| slots.pop_lru()).collect()
        };
        tracing::debug!(count = drained.len(), "evicted all decoders");
    }

    /// Number of decoder slots currently held.
    pub fn open_handles(&self) -> usize {
        self.slots().len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/video_source.rs"]
mod tests;
