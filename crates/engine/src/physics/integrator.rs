use crate::math::approach;

use super::body::PhysicsBody;

/// Largest step a single tick may integrate, whatever the wall clock says.
pub const MAX_STEP_SECONDS: f32 = 1.0 / 30.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gravity {
    /// Vertical acceleration; negative pulls down.
    pub acceleration: f32,
    /// Most negative vertical velocity a falling body may reach.
    pub terminal_velocity: f32,
}

pub fn clamp_step_seconds(dt_seconds: f32) -> f32 {
    if !dt_seconds.is_finite() || dt_seconds <= 0.0 {
        return 0.0;
    }
    dt_seconds.min(MAX_STEP_SECONDS)
}

pub fn apply_gravity(body: &mut PhysicsBody, gravity: &Gravity, dt_seconds: f32) {
    if body.is_static || !body.affected_by_gravity {
        return;
    }
    body.velocity.y += gravity.acceleration * dt_seconds;
    body.velocity.y = body.velocity.y.max(gravity.terminal_velocity);
}

/// Moves a velocity component toward `target`, using `acceleration` while
/// speeding up and `deceleration` while stopping or turning around.
pub fn accelerate_toward(
    current: f32,
    target: f32,
    acceleration: f32,
    deceleration: f32,
    dt_seconds: f32,
) -> f32 {
    let slowing = target == 0.0
        || (current != 0.0 && current.signum() != target.signum())
        || current.abs() > target.abs();
    let rate = if slowing { deceleration } else { acceleration };
    approach(current, target, rate * dt_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;
    use crate::physics::body::{BodyDesc, CollisionLayers};

    fn falling_body() -> PhysicsBody {
        PhysicsBody::new(
            Vec2::new(0.0, 100.0),
            BodyDesc::dynamic(Vec2::new(8.0, 8.0), CollisionLayers(1)),
        )
        .expect("body")
    }

    const GRAVITY: Gravity = Gravity {
        acceleration: -1400.0,
        terminal_velocity: -800.0,
    };

    #[test]
    fn step_is_clamped_against_spikes() {
        assert_eq!(clamp_step_seconds(0.5), MAX_STEP_SECONDS);
        assert_eq!(clamp_step_seconds(0.01), 0.01);
        assert_eq!(clamp_step_seconds(-1.0), 0.0);
        assert_eq!(clamp_step_seconds(f32::NAN), 0.0);
    }

    #[test]
    fn gravity_respects_terminal_velocity() {
        let mut body = falling_body();
        for _ in 0..120 {
            apply_gravity(&mut body, &GRAVITY, 1.0 / 60.0);
        }
        assert_eq!(body.velocity.y, -800.0);
    }

    #[test]
    fn bodies_without_gravity_keep_velocity() {
        let mut body = falling_body();
        body.affected_by_gravity = false;
        body.velocity.y = 12.0;
        apply_gravity(&mut body, &GRAVITY, 1.0 / 60.0);
        assert_eq!(body.velocity.y, 12.0);
    }

    #[test]
    fn deceleration_applies_when_stopping_or_turning() {
        let dt = 0.1;
        assert_eq!(accelerate_toward(0.0, 100.0, 200.0, 500.0, dt), 20.0);
        assert_eq!(accelerate_toward(100.0, 0.0, 200.0, 500.0, dt), 50.0);
        assert_eq!(accelerate_toward(100.0, -100.0, 200.0, 500.0, dt), 50.0);
        assert_eq!(accelerate_toward(150.0, 100.0, 200.0, 500.0, dt), 100.0);
    }
}
