use miego_engine::{Aabb, Vec2};

use crate::config::CameraTuning;

/// Follows the player horizontally with a lead in the facing direction.
/// The vertical position is fixed at half the viewport height.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraController {
    tuning: CameraTuning,
    level_width: f32,
    position: Vec2,
}

impl CameraController {
    pub fn new(tuning: CameraTuning, level_width: f32) -> Self {
        let position = Vec2::new(tuning.viewport.width * 0.5, tuning.viewport.height * 0.5);
        let mut camera = Self {
            tuning,
            level_width,
            position,
        };
        camera.position.x = camera.clamp_x(position.x);
        camera
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn visible_rect(&self) -> Aabb {
        Aabb::new(self.position, self.tuning.viewport.half_extents())
    }

    pub fn set_level_width(&mut self, level_width: f32) {
        self.level_width = level_width;
        self.position.x = self.clamp_x(self.position.x);
    }

    pub fn target_x(&self, player_x: f32, facing_sign: f32) -> f32 {
        self.clamp_x(player_x + self.tuning.lead_offset * facing_sign)
    }

    /// Jumps straight to the target, used on load and respawn.
    pub fn snap_to(&mut self, player_x: f32, facing_sign: f32) {
        self.position.x = self.target_x(player_x, facing_sign);
    }

    /// Closes `smoothing` of the remaining distance per 1/60 s, scaled to the
    /// actual tick length.
    pub fn update(&mut self, player_x: f32, facing_sign: f32, dt_seconds: f32) {
        let target = self.target_x(player_x, facing_sign);
        let frames = (dt_seconds * 60.0).max(0.0);
        let factor = 1.0 - (1.0 - self.tuning.smoothing).powf(frames);
        self.position.x = self.clamp_x(self.position.x + (target - self.position.x) * factor);
    }

    fn clamp_x(&self, x: f32) -> f32 {
        let half = self.tuning.viewport.width * 0.5;
        if self.level_width <= half * 2.0 {
            return self.level_width * 0.5;
        }
        x.clamp(half, self.level_width - half)
    }
}
