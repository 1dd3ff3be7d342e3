use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};

use crate::config::PoolOpts;
use crate::foundation::error::{FramecastError, FramecastResult};

/// Failure modes of the bounded pull path.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeError {
    /// No render slot became free within the queue timeout.
    #[error("render queue is full")]
    Busy,
    /// The render did not finish within the processing timeout.
    #[error("render did not finish in time")]
    ProcessingTimeout,
    /// The render finished without a frame (encode failure or worker panic).
    #[error("frame not available")]
    Unavailable,
    /// The pool no longer accepts work.
    #[error("service is shutting down")]
    ShuttingDown,
}

fn build_thread_pool(threads: usize) -> FramecastResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("framecast-render-{i}"))
        .build()
        .map_err(|e| {
            FramecastError::validation(format!("failed to build rayon thread pool: {e}"))
        })
}

/// Bounded render executor shared by the pull and push paths.
///
/// At most `workers` pull requests render at once. A slot is held until the render really
/// finishes, so requests that timed out on the caller side still count against the bound.
pub struct RenderPool {
    pool: rayon::ThreadPool,
    permits_tx: Sender<()>,
    permits_rx: Receiver<()>,
    workers: usize,
    queue_timeout: std::time::Duration,
    render_timeout: std::time::Duration,
    closed: AtomicBool,
}

impl RenderPool {
    /// Build a pool. One extra thread is reserved for the playback loop's renders.
    pub fn new(opts: PoolOpts) -> FramecastResult<Self> {
        let workers = opts.workers.max(1);
        let (permits_tx, permits_rx) = bounded(workers);
        for _ in 0..workers {
            permits_tx
                .send(())
                .map_err(|_| FramecastError::validation("render permit channel closed"))?;
        }
        Ok(Self {
            pool: build_thread_pool(workers + 1)?,
            permits_tx,
            permits_rx,
            workers,
            queue_timeout: opts.queue_timeout,
            render_timeout: opts.render_timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Run `job` on the pool and wait for its result, within both timeouts.
    ///
    /// `job` returning `None` or panicking yields [`ServeError::Unavailable`].
    pub fn request<T, F>(&self, job: F) -> Result<T, ServeError>
    where
        T: Send + 'static,
        F: FnOnce() -> Option<T> + Send + 'static,
    {
        if self.is_closed() {
            return Err(ServeError::ShuttingDown);
        }
        match self.permits_rx.recv_timeout(self.queue_timeout) {
            Ok(()) => {}
            Err(RecvTimeoutError::Timeout) => return Err(ServeError::Busy),
            Err(RecvTimeoutError::Disconnected) => return Err(ServeError::ShuttingDown),
        }

        let (tx, rx) = bounded(1);
        let permit = self.permits_tx.clone();
        self.pool.spawn(move || {
            let out = catch_unwind(AssertUnwindSafe(job));
            let _ = permit.send(());
            let _ = tx.send(out);
        });

        match rx.recv_timeout(self.render_timeout) {
            Ok(Ok(Some(v))) => Ok(v),
            Ok(Ok(None)) => Err(ServeError::Unavailable),
            Ok(Err(_)) => {
                tracing::error!("render panicked");
                Err(ServeError::Unavailable)
            }
            Err(RecvTimeoutError::Timeout) => Err(ServeError::ProcessingTimeout),
            Err(RecvTimeoutError::Disconnected) => Err(ServeError::Unavailable),
        }
    }

    /// Fire-and-forget job used by the playback loop; panics are caught and logged.
    pub(crate) fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        self.pool.spawn(move || {
            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                tracing::error!("playback render panicked");
            }
        });
    }

    /// Pull-path renders currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.workers - self.permits_rx.len()
    }

    /// Maximum concurrent pull-path renders.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Refuse new requests; running renders finish normally.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether [`RenderPool::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/serve/pool.rs"]
mod tests;
