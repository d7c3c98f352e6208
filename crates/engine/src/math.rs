use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// World-space vector. The y axis grows upward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs())
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Moves `current` toward `target` by at most `max_delta` without overshooting.
pub fn approach(current: f32, target: f32, max_delta: f32) -> f32 {
    if current < target {
        (current + max_delta).min(target)
    } else {
        (current - max_delta).max(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approach_stops_at_target_from_both_sides() {
        assert_eq!(approach(0.0, 10.0, 4.0), 4.0);
        assert_eq!(approach(8.0, 10.0, 4.0), 10.0);
        assert_eq!(approach(10.0, -2.0, 5.0), 5.0);
        assert_eq!(approach(-1.0, -2.0, 5.0), -2.0);
    }

    #[test]
    fn vector_ops_are_componentwise() {
        let a = Vec2::new(1.0, -2.0);
        let b = Vec2::new(0.5, 4.0);
        assert_eq!(a + b, Vec2::new(1.5, 2.0));
        assert_eq!(a - b, Vec2::new(0.5, -6.0));
        assert_eq!(a * 2.0, Vec2::new(2.0, -4.0));
        assert_eq!(-a, Vec2::new(-1.0, 2.0));
        assert!(!Vec2::new(f32::NAN, 0.0).is_finite());
    }
}
