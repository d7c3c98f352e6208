use std::iter;
use std::process::ExitCode;
use std::time::Duration;

use miego::{HudValues, SessionSnapshot};
use miego_engine::{run_headless, MetricsHandle, SceneRunner};
use serde::Serialize;
use tracing::{error, info};

use super::autopilot::Autopilot;
use super::bootstrap::AppWiring;

#[derive(Debug, Serialize)]
struct RunReport {
    frames: u64,
    ticks: u64,
    quit_requested: bool,
    tps: f32,
    hud: HudValues,
    final_snapshot: Option<SessionSnapshot>,
}

/// Plays the game headless for the configured span of simulated 60 Hz
/// frames and prints a JSON report of how it ended.
pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        loop_config,
        scene,
        run_for,
    } = app;
    let frame = Duration::from_secs_f64(1.0 / f64::from(loop_config.target_tps.max(1)));
    let frame_count = (run_for.as_secs_f64() / frame.as_secs_f64()).ceil() as usize;

    let mut runner = SceneRunner::new(scene);
    let metrics = MetricsHandle::default();
    let mut autopilot = Autopilot::default();
    let mut last_snapshot = None;
    let summary = run_headless(
        &loop_config,
        &mut runner,
        iter::repeat(frame).take(frame_count),
        &metrics,
        |input, runner| {
            let scene = runner.scene();
            autopilot.drive(input, scene, runner.world());
            if let Some(snapshot) = scene.snapshot(runner.world()) {
                last_snapshot = Some(snapshot);
            }
        },
    );

    let report = RunReport {
        frames: summary.frames,
        ticks: summary.ticks,
        quit_requested: summary.quit_requested,
        tps: metrics.snapshot().tps,
        hud: runner.scene().game().hud(),
        final_snapshot: last_snapshot,
    };
    info!(
        score = report.hud.score,
        level = report.hud.level,
        lives = report.hud.lives,
        "run_complete"
    );
    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(%error, "report_serialize_failed");
            ExitCode::FAILURE
        }
    }
}
