//! Collision layers and contact classification for the platformer.

use miego_engine::{CollisionLayers, PhysicsBody, Vec2};

pub mod layers {
    use miego_engine::CollisionLayers;

    pub const PLAYER: CollisionLayers = CollisionLayers(1 << 0);
    pub const GROUND: CollisionLayers = CollisionLayers(1 << 1);
    pub const BLOCK: CollisionLayers = CollisionLayers(1 << 2);
    pub const ENEMY: CollisionLayers = CollisionLayers(1 << 3);
    pub const ITEM: CollisionLayers = CollisionLayers(1 << 4);
    pub const COIN: CollisionLayers = CollisionLayers(1 << 5);
    pub const FLAGPOLE: CollisionLayers = CollisionLayers(1 << 7);
    pub const FIREBALL: CollisionLayers = CollisionLayers(1 << 8);
    pub const DEATH_ZONE: CollisionLayers = CollisionLayers(1 << 9);
    pub const PLATFORM: CollisionLayers = CollisionLayers(1 << 10);
    pub const SHELL: CollisionLayers = CollisionLayers(1 << 11);
    pub const ENEMY_PROJECTILE: CollisionLayers = CollisionLayers(1 << 12);

    /// Everything a walking body stands on.
    pub const TERRAIN: CollisionLayers = CollisionLayers(GROUND.0 | BLOCK.0 | PLATFORM.0);
}

/// How a terrain hit reads from the mover's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainContact {
    Landing,
    Ceiling,
    Wall,
    Other,
}

/// Classifies a blocked move by its normal (pointing at the mover) and the
/// mover's velocity at impact.
pub fn classify_terrain(normal: Vec2, impact_velocity: Vec2, landing_threshold: f32) -> TerrainContact {
    if normal.x.abs() > 0.5 {
        TerrainContact::Wall
    } else if normal.y > 0.5 && impact_velocity.y <= landing_threshold {
        TerrainContact::Landing
    } else if normal.y < -0.5 && impact_velocity.y > 0.0 {
        TerrainContact::Ceiling
    } else {
        TerrainContact::Other
    }
}

/// A player-on-enemy contact counts as a stomp when the player's feet are
/// above the enemy's middle (within `tolerance`) and the player is not
/// rising faster than `max_vertical_speed`.
pub fn is_stomp(
    player: &PhysicsBody,
    enemy: &PhysicsBody,
    tolerance: f32,
    max_vertical_speed: f32,
) -> bool {
    player.bottom() > enemy.position.y - tolerance && player.velocity.y < max_vertical_speed
}

/// Direction pointing from `from` toward `to` along x, never zero.
pub fn direction_away(from_x: f32, to_x: f32, fallback: f32) -> f32 {
    let delta = to_x - from_x;
    if delta.abs() < f32::EPSILON {
        if fallback < 0.0 {
            -1.0
        } else {
            1.0
        }
    } else {
        delta.signum()
    }
}

/// Death zones kill on contact regardless of the player's form.
pub fn is_hazard(layers: CollisionLayers) -> bool {
    layers.intersects(layers::DEATH_ZONE)
}

#[cfg(test)]
mod tests {
    use miego_engine::BodyDesc;

    use super::*;

    fn body(center: Vec2, half: Vec2, velocity: Vec2) -> PhysicsBody {
        let mut body = PhysicsBody::new(center, BodyDesc::dynamic(half, layers::PLAYER))
            .expect("body");
        body.velocity = velocity;
        body
    }

    #[test]
    fn terrain_classification_by_normal_and_velocity() {
        assert_eq!(
            classify_terrain(Vec2::new(0.0, 1.0), Vec2::new(0.0, -300.0), 10.0),
            TerrainContact::Landing
        );
        assert_eq!(
            classify_terrain(Vec2::new(0.0, 1.0), Vec2::new(0.0, 40.0), 10.0),
            TerrainContact::Other
        );
        assert_eq!(
            classify_terrain(Vec2::new(0.0, -1.0), Vec2::new(0.0, 200.0), 10.0),
            TerrainContact::Ceiling
        );
        assert_eq!(
            classify_terrain(Vec2::new(-1.0, 0.0), Vec2::new(90.0, 0.0), 10.0),
            TerrainContact::Wall
        );
    }

    #[test]
    fn stomp_requires_feet_above_center_and_no_sharp_rise() {
        let enemy = body(Vec2::new(0.0, 13.0), Vec2::new(12.0, 13.0), Vec2::ZERO);
        let falling = body(Vec2::new(2.0, 38.0), Vec2::new(12.0, 15.0), Vec2::new(0.0, -200.0));
        assert_eq!(falling.bottom() - enemy.position.y, 10.0);
        assert!(is_stomp(&falling, &enemy, 5.0, 50.0));

        let rising = body(Vec2::new(2.0, 38.0), Vec2::new(12.0, 15.0), Vec2::new(0.0, 300.0));
        assert!(!is_stomp(&rising, &enemy, 5.0, 50.0));

        let beside = body(Vec2::new(20.0, 15.0), Vec2::new(12.0, 15.0), Vec2::new(0.0, -10.0));
        assert!(!is_stomp(&beside, &enemy, 5.0, 50.0));
    }

    #[test]
    fn direction_away_falls_back_when_aligned() {
        assert_eq!(direction_away(10.0, 20.0, -1.0), 1.0);
        assert_eq!(direction_away(20.0, 10.0, 1.0), -1.0);
        assert_eq!(direction_away(5.0, 5.0, -1.0), -1.0);
    }

    #[test]
    fn only_death_zones_count_as_hazards() {
        assert!(is_hazard(layers::DEATH_ZONE));
        assert!(is_hazard(layers::DEATH_ZONE | layers::FLAGPOLE));
        assert!(!is_hazard(layers::FLAGPOLE));
        assert!(!is_hazard(layers::GROUND | layers::ENEMY));
    }
}
