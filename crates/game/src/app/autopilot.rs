use miego::entity::{Entity, EntityKind, Trigger};
use miego::{PlatformerScene, SessionPhase};
use miego_engine::{InputCollector, SceneWorld};

/// How far ahead of the player, in tiles, gaps and enemies are noticed.
const LOOKAHEAD_TILES: f32 = 2.5;
const STUCK_FRAMES_BEFORE_JUMP: u32 = 4;
const SHOT_COOLDOWN_FRAMES: u32 = 20;

/// Scripted player for headless runs: holds right, jumps over gaps, walls
/// and enemies, throws fireballs when it can and restarts after game over.
#[derive(Debug, Default)]
pub(crate) struct Autopilot {
    last_x: Option<f32>,
    stuck_frames: u32,
    shot_cooldown: u32,
}

impl Autopilot {
    pub(crate) fn drive(
        &mut self,
        input: &mut InputCollector,
        scene: &PlatformerScene,
        world: &SceneWorld<Entity>,
    ) {
        let Some(session) = scene.session() else {
            return;
        };
        match session.phase() {
            SessionPhase::Playing => {}
            SessionPhase::GameOver => {
                input.set_movement_axis(0.0);
                input.trigger_jump();
                return;
            }
            SessionPhase::Dying { .. } | SessionPhase::LevelComplete { .. } => {
                input.set_movement_axis(0.0);
                self.last_x = None;
                return;
            }
        }

        let player = session.player();
        let x = player.body.position.x;
        input.set_movement_axis(1.0);
        self.stuck_frames = match self.last_x {
            Some(last) if (x - last).abs() < 0.5 => self.stuck_frames + 1,
            _ => 0,
        };
        self.last_x = Some(x);

        let reach = x..=x + session.tile_size() * LOOKAHEAD_TILES;
        let mut gap_ahead = false;
        let mut enemy_ahead = false;
        for (_, entity) in world.iter() {
            if !reach.contains(&entity.body.position.x) {
                continue;
            }
            match &entity.kind {
                EntityKind::Trigger(Trigger::Hazard) => gap_ahead = true,
                EntityKind::Enemy(enemy) if !enemy.is_dead() => enemy_ahead = true,
                _ => {}
            }
        }

        let grounded_jump = player.is_grounded()
            && (gap_ahead || enemy_ahead || self.stuck_frames >= STUCK_FRAMES_BEFORE_JUMP);
        let rescue_jump = !player.is_grounded()
            && player.body.velocity.y < 0.0
            && gap_ahead
            && player.air_jumps_remaining() > 0;
        if grounded_jump || rescue_jump {
            input.trigger_jump();
        }

        self.shot_cooldown = self.shot_cooldown.saturating_sub(1);
        if player.can_shoot() && enemy_ahead && self.shot_cooldown == 0 {
            input.trigger_shoot();
            self.shot_cooldown = SHOT_COOLDOWN_FRAMES;
        }
    }
}
