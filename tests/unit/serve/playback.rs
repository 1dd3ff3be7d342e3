use std::time::{Duration, Instant};

use super::*;
use crate::config::PoolOpts;

struct CountingTarget {
    total: u64,
    fps: f64,
    delay: Duration,
    gate: Option<Receiver<()>>,
}

impl CountingTarget {
    fn quick(total: u64, fps: f64) -> Self {
        Self {
            total,
            fps,
            delay: Duration::ZERO,
            gate: None,
        }
    }
}

impl PlaybackTarget for CountingTarget {
    fn timing(&self) -> (u64, Fps) {
        (self.total, Fps::or_default(self.fps))
    }

    fn render_frame(&self, frame: FrameIndex) -> Option<EncodedFrame> {
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }
        std::thread::sleep(self.delay);
        Some(frame.0.to_le_bytes().to_vec().into())
    }
}

fn playback(target: CountingTarget, opts: PlaybackOpts) -> Playback {
    let pool = RenderPool::new(PoolOpts {
        workers: 1,
        ..PoolOpts::default()
    })
    .unwrap();
    Playback::new(Arc::new(target), Arc::new(pool), opts).unwrap()
}

fn drain_for(sub: &Subscription, d: Duration) -> Vec<u64> {
    let end = Instant::now() + d;
    let mut out = Vec::new();
    while Instant::now() < end {
        if let Some(f) = sub.recv_timeout(Duration::from_millis(10)) {
            out.push(f.index.0);
        }
    }
    out
}

#[test]
fn frames_are_ordered_within_a_pass_and_loop_to_zero() {
    let pb = playback(
        CountingTarget::quick(5, 100.0),
        PlaybackOpts {
            subscriber_buffer: 256,
            loop_playback: true,
        },
    );
    let sub = pb.subscribe();
    pb.play();
    let seen = drain_for(&sub, Duration::from_millis(400));
    pb.stop();

    assert!(seen.len() >= 5, "too few frames: {seen:?}");
    for w in seen.windows(2) {
        assert!(w[1] > w[0] || w[1] == 0, "out of order: {seen:?}");
    }
    assert!(seen.iter().all(|i| *i < 5));
    assert!(seen.windows(2).any(|w| w[1] == 0), "never wrapped: {seen:?}");
}

#[test]
fn without_looping_playback_stops_at_the_end() {
    let pb = playback(
        CountingTarget::quick(3, 100.0),
        PlaybackOpts {
            subscriber_buffer: 16,
            loop_playback: false,
        },
    );
    let sub = pb.subscribe();
    pb.play();
    let seen = drain_for(&sub, Duration::from_millis(300));
    assert!(!pb.is_playing());
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[1] > w[0]), "{seen:?}");
    assert!(seen.iter().all(|i| *i < 3));
}

#[test]
fn stop_does_not_wait_for_a_stuck_render() {
    let (release, gate) = bounded::<()>(0);
    let pb = playback(
        CountingTarget {
            total: 100,
            fps: 10.0,
            delay: Duration::ZERO,
            gate: Some(gate),
        },
        PlaybackOpts::default(),
    );
    pb.play();
    std::thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    pb.stop();
    assert!(started.elapsed() < Duration::from_millis(500));
    drop(release);
}

#[test]
fn slow_renders_are_dropped_not_bursted() {
    let pb = playback(
        CountingTarget {
            total: 1_000,
            fps: 50.0,
            delay: Duration::from_millis(70),
            gate: None,
        },
        PlaybackOpts {
            subscriber_buffer: 64,
            loop_playback: true,
        },
    );
    let sub = pb.subscribe();
    pb.play();
    std::thread::sleep(Duration::from_millis(400));
    pb.stop();

    assert!(pb.stats().dropped_late > 0);
    let mut seen = Vec::new();
    while let Some(f) = sub.try_recv() {
        seen.push(f.index.0);
    }
    assert!(seen.windows(2).all(|w| w[1] > w[0]), "{seen:?}");
}

#[test]
fn seek_clamps_and_pauses() {
    let pb = playback(CountingTarget::quick(10, 30.0), PlaybackOpts::default());
    pb.play();
    assert_eq!(pb.seek(500, 10), FrameIndex(9));
    assert!(!pb.is_playing());
    assert_eq!(pb.current_frame(), 9);
    assert_eq!(pb.seek(3, 10), FrameIndex(3));
    assert_eq!(pb.seek(3, 0), FrameIndex(0));
    pb.stop();
}

#[test]
fn full_subscribers_miss_frames_and_closed_ones_are_removed() {
    let pb = playback(
        CountingTarget::quick(100, 30.0),
        PlaybackOpts {
            subscriber_buffer: 1,
            loop_playback: true,
        },
    );
    let slow = pb.subscribe();
    let gone = pb.subscribe();
    drop(gone);
    assert_eq!(pb.subscriber_count(), 2);

    pb.push(FrameIndex(0), vec![0u8].into());
    pb.push(FrameIndex(1), vec![1u8].into());
    assert_eq!(pb.subscriber_count(), 1);
    assert_eq!(pb.stats().dropped_full, 1);
    assert_eq!(slow.try_recv().map(|f| f.index), Some(FrameIndex(0)));
    pb.stop();
}

#[test]
fn stop_disconnects_subscribers() {
    let pb = playback(CountingTarget::quick(10, 30.0), PlaybackOpts::default());
    let sub = pb.subscribe();
    pb.stop();
    assert!(sub.recv().is_none());
}

fn shared(opts: PlaybackOpts) -> Shared {
    Shared {
        playing: AtomicBool::new(true),
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
    }
}

#[test]
fn advance_after_delivery_moves_to_the_next_frame() {
    let s = shared(PlaybackOpts::default());
    s.current.store(7, Ordering::SeqCst);
    let seeks = s.seeks();
    s.advance_from(7, seeks);
    assert_eq!(s.current.load(Ordering::SeqCst), 8);
}

#[test]
fn seek_to_the_delivered_frame_is_not_advanced_past() {
    let s = shared(PlaybackOpts::default());
    s.current.store(7, Ordering::SeqCst);
    // The loop read the seek count before delivering frame 7; a seek to 7 lands afterwards.
    let seeks = s.seeks();
    s.seek_to(7);
    s.advance_from(7, seeks);
    assert_eq!(s.current.load(Ordering::SeqCst), 7);
}

#[test]
fn seek_position_holds_while_playback_delivers() {
    let pb = playback(CountingTarget::quick(1_000, 200.0), PlaybackOpts::default());
    let _sub = pb.subscribe();
    for target in [40, 400, 4, 700] {
        pb.play();
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(pb.seek(target, 1_000), FrameIndex(target));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(pb.current_frame(), target);
    }
    pb.stop();
}
