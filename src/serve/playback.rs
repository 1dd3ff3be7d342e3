use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select, unbounded};

use crate::config::PlaybackOpts;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{FramecastError, FramecastResult};
use crate::render::pipeline::EncodedFrame;
use crate::serve::pool::RenderPool;

/// What the playback loop renders.
pub trait PlaybackTarget: Send + Sync + 'static {
    /// Current timeline length and frame rate; read once per tick.
    fn timing(&self) -> (u64, Fps);

    /// Render one frame; `None` when no frame could be produced.
    fn render_frame(&self, frame: FrameIndex) -> Option<EncodedFrame>;
}

/// One frame pushed to subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamFrame {
    /// Timeline frame index.
    pub index: FrameIndex,
    /// Encoded bytes.
    pub bytes: EncodedFrame,
}

/// Receiving end of a playback subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: Receiver<StreamFrame>,
}

impl Subscription {
    /// Wait up to `timeout` for the next frame.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<StreamFrame> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Next frame if one is buffered.
    pub fn try_recv(&self) -> Option<StreamFrame> {
        self.rx.try_recv().ok()
    }

    /// Block until the next frame; `None` once playback has shut down.
    pub fn recv(&self) -> Option<StreamFrame> {
        self.rx.recv().ok()
    }
}

/// Playback counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct PlaybackStats {
    /// Frames handed to the subscriber list.
    pub delivered: u64,
    /// Frames that missed their interval.
    pub dropped_late: u64,
    /// Per-subscriber drops because the buffer was full.
    pub dropped_full: u64,
    /// Renders that produced no frame.
    pub failed: u64,
}

enum Control {
    Wake,
    Stop,
}

struct Shared {
    playing: AtomicBool,
    current: AtomicU64,
    generation: AtomicU64,
    seeks: AtomicU64,
    // Held while `current` moves together with a seek-count check or bump.
    position: Mutex<()>,
    subscribers: Mutex<Vec<Sender<StreamFrame>>>,
    delivered: AtomicU64,
    dropped_late: AtomicU64,
    dropped_full: AtomicU64,
    failed: AtomicU64,
    opts: PlaybackOpts,
}

impl Shared {
    fn subscribers(&self) -> MutexGuard<'_, Vec<Sender<StreamFrame>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn position(&self) -> MutexGuard<'_, ()> {
        self.position.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `frame` and invalidate whatever is in flight.
    fn seek_to(&self, frame: u64) {
        let _position = self.position();
        self.current.store(frame, Ordering::SeqCst);
        self.seeks.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn seeks(&self) -> u64 {
        self.seeks.load(Ordering::SeqCst)
    }

    /// Frame to render next, wrapping or stopping at the end of the timeline.
    fn next_index(&self, total: u64) -> Option<u64> {
        let _position = self.position();
        let i = self.current.load(Ordering::SeqCst);
        if i < total {
            return Some(i);
        }
        if total > 0 && self.opts.loop_playback {
            self.current.store(0, Ordering::SeqCst);
            tracing::debug!("playback wrapped to frame 0");
            return Some(0);
        }
        None
    }

    /// Move past `index` unless the position moved or a seek landed after `seeks` was read.
    fn advance_from(&self, index: u64, seeks: u64) {
        let _position = self.position();
        if self.seeks() != seeks {
            return;
        }
        let _ = self.current.compare_exchange(
            index,
            index + 1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    fn broadcast(&self, frame: StreamFrame) {
        let mut subs = self.subscribers();
        subs.retain(|tx| match tx.try_send(frame.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped_full.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }
}

struct Pending {
    index: u64,
    generation: u64,
    rx: Receiver<Option<EncodedFrame>>,
    late: bool,
}

/// Paced push-path playback.
///
/// A dedicated thread dispatches one render at a time to the [`RenderPool`] and waits at most
/// one frame interval for it. Late frames are dropped rather than delivered in a burst, and a
/// stop request is observed without waiting for the in-flight render.
pub struct Playback {
    shared: Arc<Shared>,
    ctrl: Mutex<Option<Sender<Control>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Playback {
    /// Start the (paused) playback thread.
    pub fn new(
        target: Arc<dyn PlaybackTarget>,
        pool: Arc<RenderPool>,
        opts: PlaybackOpts,
    ) -> FramecastResult<Self> {
        let shared = Arc::new(Shared {
            playing: AtomicBool::new(false),
            current: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            seeks: AtomicU64::new(0),
            position: Mutex::new(()),
            subscribers: Mutex::new(Vec::new()),
            delivered: AtomicU64::new(0),
            dropped_late: AtomicU64::new(0),
            dropped_full: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            opts,
        });
        let (ctrl_tx, ctrl_rx) = unbounded();
        let loop_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name("framecast-playback".to_string())
            .spawn(move || run(loop_shared, target, pool, ctrl_rx))
            .map_err(|e| FramecastError::validation(format!("failed to spawn playback: {e}")))?;
        Ok(Self {
            shared,
            ctrl: Mutex::new(Some(ctrl_tx)),
            thread: Mutex::new(Some(thread)),
        })
    }

    fn wake(&self) {
        if let Some(tx) = self.ctrl.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            let _ = tx.send(Control::Wake);
        }
    }

    /// Start or resume playback from the current frame.
    pub fn play(&self) {
        if !self.shared.playing.swap(true, Ordering::SeqCst) {
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            tracing::info!(frame = self.current_frame(), "playback started");
        }
        self.wake();
    }

    /// Pause; a render still in flight is discarded.
    pub fn pause(&self) {
        if self.shared.playing.swap(false, Ordering::SeqCst) {
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            tracing::info!(frame = self.current_frame(), "playback paused");
        }
        self.wake();
    }

    /// Whether frames are being pushed.
    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::SeqCst)
    }

    /// Next frame playback will render.
    pub fn current_frame(&self) -> u64 {
        self.shared.current.load(Ordering::SeqCst)
    }

    /// Pause and move to `frame`, clamped to `[0, total_frames - 1]`.
    pub fn seek(&self, frame: u64, total_frames: u64) -> FrameIndex {
        self.pause();
        let target = frame.min(total_frames.saturating_sub(1));
        self.shared.seek_to(target);
        FrameIndex(target)
    }

    /// Register a subscriber with a bounded buffer.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = bounded(self.shared.opts.subscriber_buffer.max(1));
        self.shared.subscribers().push(tx);
        Subscription { rx }
    }

    /// Number of live subscribers (pruned lazily on delivery).
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers().len()
    }

    /// Push a frame to every subscriber outside the paced loop.
    pub fn push(&self, index: FrameIndex, bytes: EncodedFrame) {
        self.shared.broadcast(StreamFrame { index, bytes });
    }

    /// Current counters.
    pub fn stats(&self) -> PlaybackStats {
        PlaybackStats {
            delivered: self.shared.delivered.load(Ordering::Relaxed),
            dropped_late: self.shared.dropped_late.load(Ordering::Relaxed),
            dropped_full: self.shared.dropped_full.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
        }
    }

    /// Stop the playback thread and disconnect all subscribers. Idempotent.
    pub fn stop(&self) {
        self.shared.playing.store(false, Ordering::SeqCst);
        if let Some(tx) = self.ctrl.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = tx.send(Control::Stop);
        }
        let handle = self.thread.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            tracing::error!("playback thread panicked");
        }
        self.shared.subscribers().clear();
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.stop();
    }
}

fn dispatch(
    pool: &RenderPool,
    target: &Arc<dyn PlaybackTarget>,
    index: u64,
    generation: u64,
) -> Pending {
    let (tx, rx) = bounded(1);
    let target = Arc::clone(target);
    pool.spawn(move || {
        let _ = tx.send(target.render_frame(FrameIndex(index)));
    });
    Pending {
        index,
        generation,
        rx,
        late: false,
    }
}

fn run(
    shared: Arc<Shared>,
    target: Arc<dyn PlaybackTarget>,
    pool: Arc<RenderPool>,
    ctrl: Receiver<Control>,
) {
    let mut pending: Option<Pending> = None;
    let mut tick_end: Option<Instant> = None;

    loop {
        if !shared.playing.load(Ordering::SeqCst) {
            tick_end = None;
            match ctrl.recv() {
                Ok(Control::Wake) => continue,
                Ok(Control::Stop) | Err(_) => return,
            }
        }

        let (total, fps) = target.timing();
        let interval = fps.frame_interval();
        let deadline = *tick_end.get_or_insert_with(|| Instant::now() + interval);

        let p = match pending.take() {
            Some(p) => p,
            None => match shared.next_index(total) {
                Some(i) => dispatch(&pool, &target, i, shared.generation()),
                None => {
                    shared.playing.store(false, Ordering::SeqCst);
                    tracing::info!(total, "playback reached the end");
                    continue;
                }
            },
        };

        let rx = p.rx.clone();
        let remaining = deadline.saturating_duration_since(Instant::now());
        select! {
            recv(ctrl) -> msg => {
                pending = Some(p);
                if !matches!(msg, Ok(Control::Wake)) {
                    return;
                }
            }
            recv(rx) -> out => {
                let seeks = shared.seeks();
                if p.late || p.generation != shared.generation() {
                    tracing::trace!(frame = p.index, "discarding stale render");
                    continue;
                }
                match out {
                    Ok(Some(bytes)) => shared.broadcast(StreamFrame {
                        index: FrameIndex(p.index),
                        bytes,
                    }),
                    _ => {
                        shared.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(frame = p.index, "playback render produced no frame");
                    }
                }
                shared.advance_from(p.index, seeks);

                // Hold the frame rate: wait out the rest of this tick.
                let rest = deadline.saturating_duration_since(Instant::now());
                select! {
                    recv(ctrl) -> msg => {
                        if !matches!(msg, Ok(Control::Wake)) {
                            return;
                        }
                    }
                    default(rest) => {}
                }
                tick_end = Some(deadline + interval);
            }
            default(remaining) => {
                let seeks = shared.seeks();
                if p.generation == shared.generation() {
                    // A late render keeps its slot; the frame time it blocks is skipped.
                    let missed = if p.late {
                        shared.current.load(Ordering::SeqCst)
                    } else {
                        p.index
                    };
                    shared.dropped_late.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(frame = missed, "frame missed its interval");
                    shared.advance_from(missed, seeks);
                }
                pending = Some(Pending { late: true, ..p });
                tick_end = Some(deadline + interval);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/serve/playback.rs"]
mod tests;
