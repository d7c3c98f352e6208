use miego_engine::{EntityId, SceneWorld, Vec2};
use serde::Serialize;

use crate::config::GameConfig;
use crate::entity::{
    BlockKind, EnemyKind, EnemyState, Entity, EntityKind, EntityTag, ItemKind, PlayerState,
    ProjectileKind, ShotKind, Trigger,
};
use crate::game_state::{GameState, HudValues};

use super::LevelSession;

/// What a renderer needs to draw one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub tag: EntityTag,
    pub variant: &'static str,
    pub state: &'static str,
    pub position: Vec2,
    pub half_extents: Vec2,
    /// -1 or 1 for things that face a direction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facing: Option<f32>,
    pub blinking: bool,
    /// False during the off half of a blink cycle.
    pub visible: bool,
    /// Opacity in [0, 1]; only fading projectiles drop below 1.
    pub fade: f32,
}

/// Read-only view of a session after a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub tick: u64,
    pub phase: &'static str,
    pub paused: bool,
    pub hud: HudValues,
    pub camera: Vec2,
    pub player: EntitySnapshot,
    pub entities: Vec<EntitySnapshot>,
}

impl SessionSnapshot {
    pub fn capture(
        session: &LevelSession,
        game: &GameState,
        config: &GameConfig,
        world: &SceneWorld<Entity>,
    ) -> Self {
        let player = &session.player;
        let player_snapshot = EntitySnapshot {
            id: player.id(),
            tag: EntityTag::Player,
            variant: player_form_label(player.state()),
            state: if player.is_frozen() {
                "frozen"
            } else {
                player_form_label(player.state())
            },
            position: player.body.position,
            half_extents: player.body.half_extents(),
            facing: Some(player.facing().sign()),
            blinking: player.is_blinking(),
            visible: player.is_visible(),
            fade: 1.0,
        };
        let entities = world
            .iter()
            .map(|(id, entity)| entity_snapshot(id, entity, config))
            .collect();
        Self {
            tick: session.ticks,
            phase: session.phase.label(),
            paused: session.paused,
            hud: game.hud(),
            camera: session.camera.position(),
            player: player_snapshot,
            entities,
        }
    }
}

fn entity_snapshot(id: EntityId, entity: &Entity, config: &GameConfig) -> EntitySnapshot {
    let (variant, state, facing, fade) = match &entity.kind {
        EntityKind::Enemy(enemy) => (
            enemy_label(enemy.kind()),
            match enemy.state() {
                EnemyState::Walking => "walking",
                EnemyState::Shelled => "shelled",
                EnemyState::ShellMoving => "shell_moving",
                EnemyState::Dead => "dead",
            },
            Some(enemy.direction()),
            1.0,
        ),
        EntityKind::Item(item) => (
            item_label(item.kind()),
            item.state_label(),
            Some(item.direction()),
            1.0,
        ),
        EntityKind::Projectile(projectile) => (
            match projectile.kind() {
                ProjectileKind::Fireball => "fireball",
                ProjectileKind::Shot(ShotKind::Frost) => "frost",
                ProjectileKind::Shot(ShotKind::Flame) => "flame",
            },
            projectile.state_label(),
            Some(entity.body.velocity.x.signum()),
            projectile.fade(&config.projectiles),
        ),
        EntityKind::Block(block) => (block_label(block.kind()), block.state_label(), None, 1.0),
        EntityKind::Trigger(trigger) => (
            match trigger {
                Trigger::Hazard => "hazard",
                Trigger::Flagpole => "flagpole",
            },
            "idle",
            None,
            1.0,
        ),
    };
    EntitySnapshot {
        id,
        tag: entity.tag(),
        variant,
        state,
        position: entity.body.position,
        half_extents: entity.body.half_extents(),
        facing,
        blinking: false,
        visible: true,
        fade,
    }
}

fn player_form_label(state: PlayerState) -> &'static str {
    match state {
        PlayerState::Small => "small",
        PlayerState::Big => "big",
        PlayerState::Fire => "fire",
        PlayerState::Invincible => "invincible",
        PlayerState::Dead => "dead",
    }
}

fn enemy_label(kind: EnemyKind) -> &'static str {
    match kind {
        EnemyKind::Walker => "walker",
        EnemyKind::ShellWalker => "shell_walker",
        EnemyKind::Stationary => "stationary",
        EnemyKind::Shooter(ShotKind::Frost) => "frost_shooter",
        EnemyKind::Shooter(ShotKind::Flame) => "flame_shooter",
    }
}

fn item_label(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Coin => "coin",
        ItemKind::Mushroom => "mushroom",
        ItemKind::FireFlower => "fire_flower",
        ItemKind::Star => "star",
        ItemKind::ExtraLife => "extra_life",
    }
}

fn block_label(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Ground => "ground",
        BlockKind::Brick => "brick",
        BlockKind::Question => "question",
        BlockKind::Pipe => "pipe",
        BlockKind::Platform => "platform",
    }
}
