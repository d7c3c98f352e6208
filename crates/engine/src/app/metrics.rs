use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::warn;

static POISON_WARNED: AtomicBool = AtomicBool::new(false);

/// A panicking publisher must not take the reader down with it; the last
/// written snapshot is still a valid value.
fn recover<G>(operation: &'static str, poisoned: PoisonError<G>) -> G {
    if !POISON_WARNED.swap(true, Ordering::Relaxed) {
        warn!(operation, "loop_metrics_lock_poisoned");
    }
    poisoned.into_inner()
}

/// Loop health over the last reporting window. Rates are measured against
/// simulated frame time, so a headless run reports the rate the simulation
/// believes it ran at.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    /// Most ticks any single frame of the window had to catch up on.
    pub peak_ticks_per_frame: u32,
    pub total_ticks: u64,
    pub dropped_backlog_ms: f32,
}

/// Shared read side of the metrics; clones see the same snapshot.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        *self
            .latest
            .read()
            .unwrap_or_else(|poisoned| recover("read", poisoned))
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        *self
            .latest
            .write()
            .unwrap_or_else(|poisoned| recover("write", poisoned)) = snapshot;
    }
}

#[derive(Debug, Default)]
struct Window {
    elapsed: Duration,
    frames: u32,
    ticks: u32,
    peak_ticks_per_frame: u32,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval: Duration,
    window: Window,
    total_ticks: u64,
    dropped_backlog: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            window: Window::default(),
            total_ticks: 0,
            dropped_backlog: Duration::ZERO,
        }
    }

    /// Closes a frame that ran `ticks` simulation steps.
    pub(crate) fn record_frame(&mut self, frame_dt: Duration, ticks: u32) {
        let window = &mut self.window;
        window.elapsed = window.elapsed.saturating_add(frame_dt);
        window.frames = window.frames.saturating_add(1);
        window.ticks = window.ticks.saturating_add(ticks);
        window.peak_ticks_per_frame = window.peak_ticks_per_frame.max(ticks);
        self.total_ticks = self.total_ticks.saturating_add(u64::from(ticks));
    }

    pub(crate) fn record_dropped_backlog(&mut self, dropped: Duration) {
        self.dropped_backlog = self.dropped_backlog.saturating_add(dropped);
    }

    /// Emits a snapshot and starts a new window once `interval` of frame
    /// time has accumulated.
    pub(crate) fn maybe_snapshot(&mut self) -> Option<LoopMetricsSnapshot> {
        if self.window.elapsed < self.interval {
            return None;
        }
        let window = mem::take(&mut self.window);
        let seconds = window.elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if window.frames == 0 {
            0.0
        } else {
            seconds * 1000.0 / window.frames as f32
        };
        Some(LoopMetricsSnapshot {
            fps: window.frames as f32 / seconds,
            tps: window.ticks as f32 / seconds,
            frame_time_ms,
            peak_ticks_per_frame: window.peak_ticks_per_frame,
            total_ticks: self.total_ticks,
            dropped_backlog_ms: self.dropped_backlog.as_secs_f32() * 1000.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn poisoned_handle() -> MetricsHandle {
        let handle = MetricsHandle::default();
        let writer = handle.clone();
        let _ = thread::spawn(move || {
            let _guard = writer.latest.write().expect("write guard");
            panic!("poison the metrics lock");
        })
        .join();
        handle
    }

    #[test]
    fn window_rates_follow_simulated_frame_time() {
        let mut metrics = MetricsAccumulator::new(Duration::from_millis(50));
        metrics.record_frame(Duration::from_millis(25), 1);
        assert!(metrics.maybe_snapshot().is_none());

        metrics.record_frame(Duration::from_millis(25), 3);
        metrics.record_dropped_backlog(Duration::from_millis(8));
        let snapshot = metrics.maybe_snapshot().expect("window closed");

        assert!((snapshot.fps - 40.0).abs() < 0.05);
        assert!((snapshot.tps - 80.0).abs() < 0.05);
        assert!((snapshot.frame_time_ms - 25.0).abs() < 0.001);
        assert_eq!(snapshot.peak_ticks_per_frame, 3);
        assert_eq!(snapshot.total_ticks, 4);
        assert!((snapshot.dropped_backlog_ms - 8.0).abs() < 0.001);
    }

    #[test]
    fn a_new_window_starts_after_each_snapshot() {
        let mut metrics = MetricsAccumulator::new(Duration::from_millis(20));
        metrics.record_frame(Duration::from_millis(20), 4);
        metrics.maybe_snapshot().expect("first window");

        metrics.record_frame(Duration::from_millis(20), 1);
        let second = metrics.maybe_snapshot().expect("second window");
        assert_eq!(second.peak_ticks_per_frame, 1);
        assert_eq!(second.total_ticks, 5);
    }

    #[test]
    fn poisoned_handle_still_reads_and_publishes() {
        let handle = poisoned_handle();
        assert_eq!(handle.snapshot(), LoopMetricsSnapshot::default());

        let published = LoopMetricsSnapshot {
            fps: 30.0,
            tps: 60.0,
            total_ticks: 120,
            ..LoopMetricsSnapshot::default()
        };
        handle.publish(published);
        assert_eq!(handle.snapshot(), published);
    }
}
