use miego_engine::{BodyDesc, BodyError, CollisionLayers, PhysicsBody, Vec2};
use serde::Serialize;

use crate::collision::layers;
use crate::config::ItemTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Coin,
    Mushroom,
    FireFlower,
    Star,
    ExtraLife,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemPhase {
    /// Level-placed coin waiting to be touched.
    Placed,
    /// Rising out of a block until its center reaches `target_y`.
    Emerging { target_y: f32 },
    Active,
    /// Cosmetic coin pop; already paid, cannot be collected.
    Popping,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    kind: ItemKind,
    phase: ItemPhase,
    direction: f32,
    timer: f32,
}

impl Item {
    pub fn placed_coin(center: Vec2, tuning: &ItemTuning) -> Result<(Self, PhysicsBody), BodyError> {
        let body = PhysicsBody::new(
            center,
            BodyDesc::fixed(tuning.coin_size.half_extents(), layers::COIN)
                .with_contact_mask(layers::PLAYER),
        )?;
        Ok((Self::with_phase(ItemKind::Coin, ItemPhase::Placed, 0.0), body))
    }

    /// A power-up starting inside the block at `block_center`, rising one
    /// tile before physics takes over.
    pub fn emerging(
        kind: ItemKind,
        block_center: Vec2,
        tile_size: f32,
        tuning: &ItemTuning,
    ) -> Result<(Self, PhysicsBody), BodyError> {
        let mut body = PhysicsBody::new(
            block_center,
            BodyDesc::dynamic(tuning.power_up_size.half_extents(), layers::ITEM)
                .with_contact_mask(layers::PLAYER)
                .with_gravity(false),
        )?;
        body.velocity = Vec2::new(0.0, tuning.emerge_speed);
        let phase = ItemPhase::Emerging {
            target_y: block_center.y + tile_size,
        };
        Ok((Self::with_phase(kind, phase, 0.0), body))
    }

    /// The coin that flies out of a block; the score is paid on release.
    pub fn coin_pop(
        block_center: Vec2,
        tile_size: f32,
        tuning: &ItemTuning,
    ) -> Result<(Self, PhysicsBody), BodyError> {
        let mut body = PhysicsBody::new(
            block_center + Vec2::new(0.0, tile_size),
            BodyDesc::dynamic(tuning.coin_size.half_extents(), CollisionLayers::NONE),
        )?;
        body.velocity = Vec2::new(0.0, tuning.coin_pop_speed);
        Ok((
            Self::with_phase(ItemKind::Coin, ItemPhase::Popping, tuning.coin_pop_seconds),
            body,
        ))
    }

    fn with_phase(kind: ItemKind, phase: ItemPhase, timer: f32) -> Self {
        Self {
            kind,
            phase,
            direction: 1.0,
            timer,
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn phase(&self) -> ItemPhase {
        self.phase
    }

    pub fn direction(&self) -> f32 {
        self.direction
    }

    pub fn is_collectible(&self) -> bool {
        self.phase != ItemPhase::Popping
    }

    pub fn state_label(&self) -> &'static str {
        match self.phase {
            ItemPhase::Placed => "placed",
            ItemPhase::Emerging { .. } => "emerging",
            ItemPhase::Active => "active",
            ItemPhase::Popping => "popping",
        }
    }

    /// Advances timers and sets this tick's velocity. Returns true once the
    /// item has timed out.
    pub fn update(&mut self, body: &mut PhysicsBody, dt_seconds: f32, tuning: &ItemTuning) -> bool {
        match self.phase {
            ItemPhase::Placed => false,
            ItemPhase::Emerging { target_y } => {
                if body.position.y >= target_y {
                    body.position.y = target_y;
                    self.activate(body, tuning);
                } else {
                    body.velocity = Vec2::new(0.0, tuning.emerge_speed);
                }
                false
            }
            ItemPhase::Active => {
                body.velocity.x = self.walk_speed(tuning) * self.direction;
                self.timer -= dt_seconds;
                self.timer <= 0.0
            }
            ItemPhase::Popping => {
                self.timer -= dt_seconds;
                self.timer <= 0.0
            }
        }
    }

    fn activate(&mut self, body: &mut PhysicsBody, tuning: &ItemTuning) {
        self.phase = ItemPhase::Active;
        self.timer = tuning.lifetime_seconds;
        body.collision_mask = layers::TERRAIN;
        body.affected_by_gravity = true;
        body.velocity = Vec2::new(self.walk_speed(tuning) * self.direction, 0.0);
        if self.kind == ItemKind::Star {
            body.velocity.y = tuning.star_bounce_impulse;
        }
    }

    fn walk_speed(&self, tuning: &ItemTuning) -> f32 {
        match self.kind {
            ItemKind::Mushroom | ItemKind::ExtraLife => tuning.mushroom_speed,
            ItemKind::Star => tuning.star_speed,
            ItemKind::FireFlower | ItemKind::Coin => 0.0,
        }
    }

    pub fn on_wall(&mut self) {
        if self.phase == ItemPhase::Active {
            self.direction = -self.direction;
        }
    }

    /// Stars bounce back with their impact speed, never below the bounce
    /// impulse.
    pub fn on_landing(&mut self, body: &mut PhysicsBody, impact_velocity_y: f32, tuning: &ItemTuning) {
        if self.phase == ItemPhase::Active && self.kind == ItemKind::Star {
            body.velocity.y = (-impact_velocity_y).max(tuning.star_bounce_impulse);
        }
    }
}
