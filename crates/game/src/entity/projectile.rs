use miego_engine::{BodyDesc, BodyError, CollisionLayers, PhysicsBody, Vec2};
use serde::Serialize;

use crate::collision::layers;
use crate::config::ProjectileTuning;

/// What a shooter enemy throws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotKind {
    /// Freezes the player; rests where it lands.
    Frost,
    /// Hurts like any enemy touch; burns out on terrain.
    Flame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    Fireball,
    Shot(ShotKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectilePhase {
    Flying,
    Resting,
    Fading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainOutcome {
    Bounced,
    Rested,
    Destroyed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    kind: ProjectileKind,
    phase: ProjectilePhase,
    timer: f32,
}

impl Projectile {
    /// Player fireball launched from `origin` in `direction` (-1 or 1).
    pub fn fireball(
        origin: Vec2,
        direction: f32,
        tuning: &ProjectileTuning,
    ) -> Result<(Self, PhysicsBody), BodyError> {
        let mut body = PhysicsBody::new(
            origin,
            BodyDesc::dynamic(tuning.fireball_size.half_extents(), layers::FIREBALL)
                .with_collision_mask(layers::TERRAIN)
                .with_contact_mask(layers::ENEMY),
        )?;
        body.velocity = Vec2::new(tuning.fireball_speed * direction, 0.0);
        let projectile = Self {
            kind: ProjectileKind::Fireball,
            phase: ProjectilePhase::Flying,
            timer: tuning.fireball_lifetime_seconds,
        };
        Ok((projectile, body))
    }

    /// Enemy shot lobbed forward in an arc.
    pub fn enemy_shot(
        kind: ShotKind,
        origin: Vec2,
        direction: f32,
        tuning: &ProjectileTuning,
    ) -> Result<(Self, PhysicsBody), BodyError> {
        let size = match kind {
            ShotKind::Frost => tuning.frost_size,
            ShotKind::Flame => tuning.flame_size,
        };
        let mut body = PhysicsBody::new(
            origin,
            BodyDesc::dynamic(size.half_extents(), layers::ENEMY_PROJECTILE)
                .with_collision_mask(layers::GROUND | layers::BLOCK)
                .with_contact_mask(layers::PLAYER),
        )?;
        body.velocity = Vec2::new(
            tuning.throw_speed * direction,
            tuning.throw_speed * tuning.throw_lift_ratio,
        );
        let projectile = Self {
            kind: ProjectileKind::Shot(kind),
            phase: ProjectilePhase::Flying,
            timer: tuning.air_lifetime_seconds,
        };
        Ok((projectile, body))
    }

    pub fn kind(&self) -> ProjectileKind {
        self.kind
    }

    pub fn phase(&self) -> ProjectilePhase {
        self.phase
    }

    pub fn is_fireball(&self) -> bool {
        self.kind == ProjectileKind::Fireball
    }

    pub fn state_label(&self) -> &'static str {
        match self.phase {
            ProjectilePhase::Flying => "flying",
            ProjectilePhase::Resting => "resting",
            ProjectilePhase::Fading => "fading",
        }
    }

    /// Opacity in [0, 1]; below 1 only while fading.
    pub fn fade(&self, tuning: &ProjectileTuning) -> f32 {
        match self.phase {
            ProjectilePhase::Fading if tuning.fade_seconds > 0.0 => {
                (self.timer / tuning.fade_seconds).clamp(0.0, 1.0)
            }
            ProjectilePhase::Fading => 0.0,
            _ => 1.0,
        }
    }

    /// Returns true when the projectile should be removed.
    pub fn update(&mut self, dt_seconds: f32, tuning: &ProjectileTuning) -> bool {
        self.timer -= dt_seconds;
        if self.timer > 0.0 {
            return false;
        }
        match self.phase {
            ProjectilePhase::Resting => {
                self.phase = ProjectilePhase::Fading;
                self.timer = tuning.fade_seconds;
                self.timer <= 0.0
            }
            ProjectilePhase::Flying | ProjectilePhase::Fading => true,
        }
    }

    /// Reacts to a blocked move. `normal` points from the terrain toward the
    /// projectile.
    pub fn on_terrain(
        &mut self,
        body: &mut PhysicsBody,
        normal: Vec2,
        tuning: &ProjectileTuning,
    ) -> TerrainOutcome {
        if self.phase != ProjectilePhase::Flying {
            return TerrainOutcome::Unchanged;
        }
        match self.kind {
            ProjectileKind::Fireball if normal.y > 0.5 => {
                body.velocity.y = tuning.fireball_bounce_speed;
                TerrainOutcome::Bounced
            }
            ProjectileKind::Fireball | ProjectileKind::Shot(ShotKind::Flame) => {
                TerrainOutcome::Destroyed
            }
            ProjectileKind::Shot(ShotKind::Frost) => {
                self.phase = ProjectilePhase::Resting;
                self.timer = tuning.rest_seconds;
                body.velocity = Vec2::ZERO;
                body.affected_by_gravity = false;
                body.collision_mask = CollisionLayers::NONE;
                TerrainOutcome::Rested
            }
        }
    }
}
