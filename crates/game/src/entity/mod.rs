//! Entity kinds and their state machines. Every entity owns exactly one
//! [`PhysicsBody`]; the session owns every entity.

mod block;
mod enemy;
mod item;
mod player;
mod projectile;

use miego_engine::PhysicsBody;
use serde::Serialize;

pub use block::{Block, BlockContent, BlockHitOutcome, BlockKind, Release};
pub use enemy::{DeathStyle, Enemy, EnemyKind, EnemyState, EnemyUpdate, StompOutcome};
pub use item::{Item, ItemKind, ItemPhase};
pub use player::{DamageOutcome, DeathCause, Facing, JumpKind, Player, PlayerState, PowerForm};
pub use projectile::{Projectile, ProjectileKind, ProjectilePhase, ShotKind, TerrainOutcome};

/// Level-placed sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trigger {
    Hazard,
    Flagpole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Enemy(Enemy),
    Item(Item),
    Projectile(Projectile),
    Block(Block),
    Trigger(Trigger),
}

/// Coarse kind tag for snapshots and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTag {
    Player,
    Enemy,
    Item,
    Projectile,
    Block,
    Trigger,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub body: PhysicsBody,
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(body: PhysicsBody, kind: EntityKind) -> Self {
        Self { body, kind }
    }

    pub fn tag(&self) -> EntityTag {
        match self.kind {
            EntityKind::Enemy(_) => EntityTag::Enemy,
            EntityKind::Item(_) => EntityTag::Item,
            EntityKind::Projectile(_) => EntityTag::Projectile,
            EntityKind::Block(_) => EntityTag::Block,
            EntityKind::Trigger(_) => EntityTag::Trigger,
        }
    }

    pub fn as_enemy(&self) -> Option<&Enemy> {
        match &self.kind {
            EntityKind::Enemy(enemy) => Some(enemy),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match &self.kind {
            EntityKind::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match &self.kind {
            EntityKind::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_projectile(&self) -> Option<&Projectile> {
        match &self.kind {
            EntityKind::Projectile(projectile) => Some(projectile),
            _ => None,
        }
    }

    pub fn as_trigger(&self) -> Option<Trigger> {
        match self.kind {
            EntityKind::Trigger(trigger) => Some(trigger),
            _ => None,
        }
    }
}
