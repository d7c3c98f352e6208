use std::time::Duration;

use tracing::{info, warn};

use super::input::{InputCollector, TouchMapping};
use super::metrics::{MetricsAccumulator, MetricsHandle};
use super::scene::{Scene, SceneCommand, SceneRunner};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub touch_mapping: TouchMapping,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_secs_f64(1.0 / 30.0),
            max_ticks_per_frame: 4,
            metrics_log_interval: Duration::from_secs(1),
            touch_mapping: TouchMapping::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub ticks_to_run: u32,
    pub remaining_accumulator: Duration,
    pub dropped_backlog: Duration,
}

/// Fixed-step accumulator. Wall-clock frame deltas go in, a tick count comes out.
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    fixed_dt: Duration,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    accumulator: Duration,
}

impl FixedStepClock {
    pub fn new(config: &LoopConfig) -> Self {
        let target_tps = config.target_tps.max(1);
        let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
        Self {
            fixed_dt,
            max_frame_delta: normalize_non_zero_duration(config.max_frame_delta, fixed_dt),
            max_ticks_per_frame: config.max_ticks_per_frame.max(1),
            accumulator: Duration::ZERO,
        }
    }

    pub fn fixed_dt(&self) -> Duration {
        self.fixed_dt
    }

    pub fn fixed_dt_seconds(&self) -> f32 {
        self.fixed_dt.as_secs_f32()
    }

    pub fn advance(&mut self, raw_frame_dt: Duration) -> StepPlan {
        let frame_dt = clamp_frame_delta(raw_frame_dt, self.max_frame_delta);
        let accumulated = self.accumulator.saturating_add(frame_dt);
        let plan = plan_sim_steps(accumulated, self.fixed_dt, self.max_ticks_per_frame);
        self.accumulator = plan.remaining_accumulator;
        plan
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub ticks: u64,
    pub quit_requested: bool,
}

/// Drives a scene over a sequence of frame deltas without a window.
///
/// `feed_input` runs once per frame, before that frame's ticks; continuous
/// input it sets persists and edges are consumed by the first tick.
pub fn run_headless<S, I, F>(
    config: &LoopConfig,
    runner: &mut SceneRunner<S>,
    frame_deltas: I,
    metrics: &MetricsHandle,
    mut feed_input: F,
) -> RunSummary
where
    S: Scene,
    I: IntoIterator<Item = Duration>,
    F: FnMut(&mut InputCollector, &SceneRunner<S>),
{
    let mut clock = FixedStepClock::new(config);
    let mut collector = InputCollector::new(config.touch_mapping);
    let mut accumulator = MetricsAccumulator::new(normalize_non_zero_duration(
        config.metrics_log_interval,
        Duration::from_secs(1),
    ));
    let mut summary = RunSummary::default();

    runner.load();
    info!(
        target_tps = config.target_tps,
        max_ticks_per_frame = config.max_ticks_per_frame,
        max_frame_delta_ms = config.max_frame_delta.as_secs_f32() * 1000.0,
        "loop_started"
    );

    'frames: for raw_frame_dt in frame_deltas {
        feed_input(&mut collector, runner);
        let plan = clock.advance(raw_frame_dt);
        if !plan.dropped_backlog.is_zero() {
            warn!(
                dropped_backlog_ms = plan.dropped_backlog.as_secs_f32() * 1000.0,
                ticks_run = plan.ticks_to_run,
                "sim_clamp_triggered"
            );
            accumulator.record_dropped_backlog(plan.dropped_backlog);
        }

        let mut ticks_run = 0;
        for _ in 0..plan.ticks_to_run {
            let input = collector.snapshot_for_tick();
            let command = runner.update(clock.fixed_dt_seconds(), &input);
            ticks_run += 1;
            summary.ticks = summary.ticks.saturating_add(1);
            if command == SceneCommand::Quit || input.quit_requested() {
                summary.quit_requested = true;
                accumulator.record_frame(raw_frame_dt, ticks_run);
                summary.frames = summary.frames.saturating_add(1);
                break 'frames;
            }
        }

        accumulator.record_frame(raw_frame_dt, ticks_run);
        summary.frames = summary.frames.saturating_add(1);
        if let Some(snapshot) = accumulator.maybe_snapshot() {
            metrics.publish(snapshot);
            info!(
                fps = snapshot.fps,
                tps = snapshot.tps,
                frame_time_ms = snapshot.frame_time_ms,
                peak_ticks_per_frame = snapshot.peak_ticks_per_frame,
                total_ticks = snapshot.total_ticks,
                "loop_metrics"
            );
        }
    }

    runner.shutdown();
    info!(
        frames = summary.frames,
        ticks = summary.ticks,
        quit_requested = summary.quit_requested,
        "loop_finished"
    );
    summary
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        let dropped_backlog = accumulator;
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
