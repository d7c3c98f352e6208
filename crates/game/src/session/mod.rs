//! One playthrough: the level session that owns the player, the terrain
//! index and the contact trackers, and the scene that rebuilds it on
//! restart and level advance.

mod snapshot;
mod systems;

use miego_engine::{
    BodyDesc, BodyError, Contact, ContactProbe, ContactTracker, EntityId, GridError, InputSnapshot,
    PhysicsBody, Scene, SceneCommand, SceneWorld, Solid, StaticIndex, SweepHit, Vec2,
};
use thiserror::Error;
use tracing::{error, info};

use crate::camera::CameraController;
use crate::collision::layers;
use crate::config::{ConfigError, GameConfig};
use crate::entity::{Block, Enemy, Entity, EntityKind, Item, Player, Trigger};
use crate::events::{GameEvent, GameEventBus, GameEventObserver};
use crate::game_state::GameState;
use crate::level::{GridPos, LevelData, LevelGenerator, Tile};

pub use snapshot::{EntitySnapshot, SessionSnapshot};

use systems::TickContext;

/// Height of the flagpole sensor, in tiles, measured up from its cell.
const FLAGPOLE_HEIGHT_TILES: f32 = 4.0;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to build a body: {0}")]
    Body(#[from] BodyError),
    #[error("failed to generate a level: {0}")]
    Generate(#[from] GridError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionPhase {
    Playing,
    /// Counting down to a respawn or to game over.
    Dying { remaining: f32 },
    /// Flag reached; the next level loads when the countdown ends.
    LevelComplete { remaining: f32 },
    /// Waits for a jump press to start a new game.
    GameOver,
}

impl SessionPhase {
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Playing => "playing",
            SessionPhase::Dying { .. } => "dying",
            SessionPhase::LevelComplete { .. } => "level_complete",
            SessionPhase::GameOver => "game_over",
        }
    }
}

/// Everything that lives exactly as long as one loaded level.
#[derive(Debug)]
pub struct LevelSession {
    level: LevelData,
    tile_size: f32,
    world_width: f32,
    player: Player,
    camera: CameraController,
    terrain: StaticIndex,
    terrain_contacts: ContactTracker,
    overlap_contacts: ContactTracker,
    phase: SessionPhase,
    paused: bool,
    input_lockout: f32,
    clock: f64,
    ticks: u64,
    hits: Vec<SweepHit>,
    probes: Vec<ContactProbe>,
    contacts: Vec<Contact>,
    removed_solids: Vec<EntityId>,
}

impl LevelSession {
    /// Spawns every tile of `level` into `world` and places the player on
    /// its spawn cell.
    pub fn build(
        config: &GameConfig,
        level: LevelData,
        world: &mut SceneWorld<Entity>,
    ) -> Result<Self, SessionError> {
        let tile_size = config.tile_size;
        let mut terrain = StaticIndex::new(tile_size);

        for (column, row, tile) in level.tiles().cells() {
            let pos = GridPos { column, row };
            let center = level.cell_center(pos, tile_size);
            if let Some(block) = Block::from_tile(*tile) {
                let body = block.body(center, tile_size)?;
                let solid = Solid::from_body(EntityId(0), &body);
                let id = world.spawn(Entity::new(body, EntityKind::Block(block)));
                terrain.insert(Solid { owner: id, ..solid });
                continue;
            }
            match *tile {
                Tile::Hazard => {
                    let body = PhysicsBody::new(
                        center,
                        BodyDesc::fixed(Vec2::new(tile_size * 0.5, tile_size * 0.5), layers::DEATH_ZONE)
                            .with_contact_mask(layers::PLAYER),
                    )?;
                    world.spawn(Entity::new(body, EntityKind::Trigger(Trigger::Hazard)));
                }
                Tile::FlagpoleMarker => {
                    let half = Vec2::new(tile_size * 0.25, tile_size * FLAGPOLE_HEIGHT_TILES * 0.5);
                    let feet = level.cell_floor(pos, tile_size);
                    let body = PhysicsBody::new(
                        feet + Vec2::new(0.0, half.y),
                        BodyDesc::fixed(half, layers::FLAGPOLE).with_contact_mask(layers::PLAYER),
                    )?;
                    world.spawn(Entity::new(body, EntityKind::Trigger(Trigger::Flagpole)));
                }
                Tile::CoinMarker => {
                    let (item, body) = Item::placed_coin(center, &config.items)?;
                    world.spawn(Entity::new(body, EntityKind::Item(item)));
                }
                Tile::EnemySpawnMarker(kind) => {
                    let feet = level.cell_floor(pos, tile_size);
                    let (enemy, body) = Enemy::spawn(kind, feet, &config.enemy)?;
                    world.spawn(Entity::new(body, EntityKind::Enemy(enemy)));
                }
                _ => {}
            }
        }

        let feet = level.cell_floor(level.player_spawn(), tile_size);
        let player = Player::new(world.allocate_id(), feet, &config.player)?;
        let world_width = level.world_width(tile_size);
        let mut camera = CameraController::new(config.camera.clone(), world_width);
        camera.snap_to(player.body.position.x, player.facing().sign());

        Ok(Self {
            level,
            tile_size,
            world_width,
            player,
            camera,
            terrain,
            terrain_contacts: ContactTracker::default(),
            overlap_contacts: ContactTracker::default(),
            phase: SessionPhase::Playing,
            paused: false,
            input_lockout: config.session.input_lockout_seconds,
            clock: 0.0,
            ticks: 0,
            hits: Vec::new(),
            probes: Vec::new(),
            contacts: Vec::new(),
            removed_solids: Vec::new(),
        })
    }

    pub fn level(&self) -> &LevelData {
        &self.level
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Seconds simulated since the level loaded, pauses excluded.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn world_width(&self) -> f32 {
        self.world_width
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }
}

/// The platformer as an engine scene. Score, lives and the level number
/// outlive each [`LevelSession`]; a hard reset rebuilds the session from
/// the level the game state points at.
#[derive(Debug)]
pub struct PlatformerScene {
    config: GameConfig,
    generator: LevelGenerator,
    seed: Option<u64>,
    fixed_level: Option<LevelData>,
    game: GameState,
    events: GameEventBus,
    session: Option<LevelSession>,
}

impl PlatformerScene {
    /// Generated levels. With a seed, level `n` always comes out the same.
    pub fn new(config: GameConfig, seed: Option<u64>) -> Result<Self, ConfigError> {
        config.validate()?;
        let generator = LevelGenerator::new(config.level.clone())?;
        Ok(Self {
            game: GameState::new(config.scoring.clone()),
            generator,
            seed,
            fixed_level: None,
            events: GameEventBus::default(),
            session: None,
            config,
        })
    }

    /// Plays `level` for every level number instead of generating.
    pub fn with_level(config: GameConfig, level: LevelData) -> Result<Self, ConfigError> {
        let mut scene = Self::new(config, level.seed())?;
        scene.fixed_level = Some(level);
        Ok(scene)
    }

    pub fn subscribe(&mut self, observer: Box<dyn GameEventObserver>) {
        self.events.subscribe(observer);
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn session(&self) -> Option<&LevelSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut LevelSession> {
        self.session.as_mut()
    }

    pub fn last_tick_events(&self) -> &[GameEvent] {
        self.events.last_tick_events()
    }

    pub fn snapshot(&self, world: &SceneWorld<Entity>) -> Option<SessionSnapshot> {
        self.session
            .as_ref()
            .map(|session| SessionSnapshot::capture(session, &self.game, &self.config, world))
    }

    fn level_for(&self, level: u32) -> Result<LevelData, SessionError> {
        match &self.fixed_level {
            Some(fixed) => Ok(fixed.clone()),
            None => {
                let seed = self.seed.map(|seed| seed.wrapping_add(u64::from(level)));
                Ok(self.generator.generate(level, seed)?)
            }
        }
    }
}

impl Scene for PlatformerScene {
    type Entity = Entity;

    fn load(&mut self, world: &mut SceneWorld<Entity>) {
        let loaded = self
            .level_for(self.game.level())
            .and_then(|level| LevelSession::build(&self.config, level, world));
        match loaded {
            Ok(session) => {
                info!(
                    level = self.game.level(),
                    seed = session.level.seed(),
                    width = session.level.width(),
                    entity_count = world.pending_spawn_count(),
                    "level_loaded"
                );
                self.session = Some(session);
            }
            Err(error) => {
                error!(level = self.game.level(), %error, "level_load_failed");
                self.session = None;
            }
        }
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld<Entity>,
    ) -> SceneCommand {
        let Some(session) = self.session.as_mut() else {
            return SceneCommand::Quit;
        };
        let mut context = TickContext {
            config: &self.config,
            game: &mut self.game,
            events: &mut self.events,
        };
        let command = match session.tick(fixed_dt_seconds, input, &mut context, world) {
            Ok(command) => command,
            Err(error) => {
                error!(%error, "session_tick_failed");
                SceneCommand::Quit
            }
        };
        self.events.dispatch();
        command
    }

    fn unload(&mut self, _world: &mut SceneWorld<Entity>) {
        if let Some(session) = self.session.take() {
            info!(
                level = self.game.level(),
                ticks = session.ticks,
                score = self.game.score(),
                "level_unloaded"
            );
        }
    }

    fn debug_title(&self, _world: &SceneWorld<Entity>) -> Option<String> {
        let hud = self.game.hud();
        Some(format!(
            "SuperMiego | level {} | score {} | coins {} | lives {} | time {}",
            hud.level, hud.score, hud.coins, hud.lives, hud.seconds_left
        ))
    }
}
