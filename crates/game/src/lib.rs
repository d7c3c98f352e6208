//! SuperMiego: a procedurally generated side-scrolling platformer running
//! on the `miego-engine` fixed-tick scene runtime.

pub mod camera;
pub mod collision;
pub mod config;
pub mod entity;
pub mod events;
pub mod game_state;
pub mod level;
pub mod session;

pub use camera::CameraController;
pub use config::{ConfigError, GameConfig, CONFIG_ENV_VAR};
pub use events::{GameEvent, GameEventBus, GameEventObserver, TracingObserver};
pub use game_state::{GameState, HudValues};
pub use level::{LevelData, LevelGenerator};
pub use session::{
    EntitySnapshot, LevelSession, PlatformerScene, SessionError, SessionPhase, SessionSnapshot,
};
