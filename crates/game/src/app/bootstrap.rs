use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use miego::{ConfigError, GameConfig, PlatformerScene, TracingObserver, CONFIG_ENV_VAR};
use miego_engine::LoopConfig;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SEED_ENV_VAR: &str = "MIEGO_SEED";
const RUN_SECONDS_ENV_VAR: &str = "MIEGO_RUN_SECONDS";
const DEFAULT_RUN_SECONDS: f64 = 60.0;

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{var} must be {expected}, got {value:?}")]
    Env {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

pub(crate) struct AppWiring {
    pub(crate) loop_config: LoopConfig,
    pub(crate) scene: PlatformerScene,
    pub(crate) run_for: Duration,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== SuperMiego Startup ===");

    let config = load_config()?;
    let seed = parse_env::<u64>(SEED_ENV_VAR, "an unsigned integer")?;
    let run_seconds = parse_env::<f64>(RUN_SECONDS_ENV_VAR, "a positive number of seconds")?
        .unwrap_or(DEFAULT_RUN_SECONDS);
    if !(run_seconds.is_finite() && run_seconds > 0.0) {
        return Err(BootstrapError::Env {
            var: RUN_SECONDS_ENV_VAR,
            expected: "a positive number of seconds",
            value: run_seconds.to_string(),
        });
    }

    let loop_config = LoopConfig {
        touch_mapping: config.session.touch_mapping,
        ..LoopConfig::default()
    };
    let mut scene = PlatformerScene::new(config, seed)?;
    scene.subscribe(Box::new(TracingObserver));
    info!(seed, run_seconds, "app_configured");

    Ok(AppWiring {
        loop_config,
        scene,
        run_for: Duration::from_secs_f64(run_seconds),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn load_config() -> Result<GameConfig, ConfigError> {
    match env::var_os(CONFIG_ENV_VAR) {
        Some(raw) => {
            let path = PathBuf::from(raw);
            info!(path = %path.display(), "config_loading");
            GameConfig::load(&path)
        }
        None => Ok(GameConfig::default()),
    }
}

fn parse_env<T: FromStr>(var: &'static str, expected: &'static str) -> Result<Option<T>, BootstrapError> {
    let Ok(raw) = env::var(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse().map(Some).map_err(|_| BootstrapError::Env {
        var,
        expected,
        value: raw.clone(),
    })
}
