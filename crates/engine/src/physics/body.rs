use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::Vec2;

/// Overlaps shallower than this on either axis count as touching, not overlapping.
pub const CONTACT_EPSILON: f32 = 1.0e-3;

/// Category / mask bits used to filter collisions and contact reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CollisionLayers(pub u32);

impl CollisionLayers {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CollisionLayers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for CollisionLayers {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for CollisionLayers {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: Vec2,
    pub half_extents: Vec2,
}

impl Aabb {
    pub fn new(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    pub fn min_x(&self) -> f32 {
        self.center.x - self.half_extents.x
    }

    pub fn max_x(&self) -> f32 {
        self.center.x + self.half_extents.x
    }

    pub fn min_y(&self) -> f32 {
        self.center.y - self.half_extents.y
    }

    pub fn max_y(&self) -> f32 {
        self.center.y + self.half_extents.y
    }

    /// Penetration depth on each axis, if the boxes overlap by more than
    /// [`CONTACT_EPSILON`] on both.
    pub fn penetration(&self, other: &Aabb) -> Option<Vec2> {
        let depth_x = self.max_x().min(other.max_x()) - self.min_x().max(other.min_x());
        let depth_y = self.max_y().min(other.max_y()) - self.min_y().max(other.min_y());
        if depth_x > CONTACT_EPSILON && depth_y > CONTACT_EPSILON {
            Some(Vec2::new(depth_x, depth_y))
        } else {
            None
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.penetration(other).is_some()
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum BodyError {
    #[error("body half extents must be positive and finite, got ({x}, {y})")]
    DegenerateExtents { x: f32, y: f32 },
    #[error("body position must be finite, got ({x}, {y})")]
    NonFinitePosition { x: f32, y: f32 },
}

/// Construction parameters for a [`PhysicsBody`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub half_extents: Vec2,
    /// Which layer this body is on.
    pub category: CollisionLayers,
    /// Static layers this body is pushed out of.
    pub collision_mask: CollisionLayers,
    /// Layers this body wants overlap reports for.
    pub contact_mask: CollisionLayers,
    pub is_static: bool,
    pub affected_by_gravity: bool,
    /// Blocks only from above; never from below or the sides.
    pub one_way: bool,
}

impl BodyDesc {
    pub fn dynamic(half_extents: Vec2, category: CollisionLayers) -> Self {
        Self {
            half_extents,
            category,
            collision_mask: CollisionLayers::NONE,
            contact_mask: CollisionLayers::NONE,
            is_static: false,
            affected_by_gravity: true,
            one_way: false,
        }
    }

    pub fn fixed(half_extents: Vec2, category: CollisionLayers) -> Self {
        Self {
            is_static: true,
            affected_by_gravity: false,
            ..Self::dynamic(half_extents, category)
        }
    }

    pub fn with_collision_mask(mut self, mask: CollisionLayers) -> Self {
        self.collision_mask = mask;
        self
    }

    pub fn with_contact_mask(mut self, mask: CollisionLayers) -> Self {
        self.contact_mask = mask;
        self
    }

    pub fn with_gravity(mut self, affected: bool) -> Self {
        self.affected_by_gravity = affected;
        self
    }

    pub fn with_one_way(mut self, one_way: bool) -> Self {
        self.one_way = one_way;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsBody {
    pub position: Vec2,
    pub velocity: Vec2,
    half_extents: Vec2,
    pub category: CollisionLayers,
    pub collision_mask: CollisionLayers,
    pub contact_mask: CollisionLayers,
    pub is_static: bool,
    pub affected_by_gravity: bool,
    pub one_way: bool,
}

impl PhysicsBody {
    pub fn new(position: Vec2, desc: BodyDesc) -> Result<Self, BodyError> {
        validate_extents(desc.half_extents)?;
        if !position.is_finite() {
            return Err(BodyError::NonFinitePosition {
                x: position.x,
                y: position.y,
            });
        }
        Ok(Self {
            position,
            velocity: Vec2::ZERO,
            half_extents: desc.half_extents,
            category: desc.category,
            collision_mask: desc.collision_mask,
            contact_mask: desc.contact_mask,
            is_static: desc.is_static,
            affected_by_gravity: desc.affected_by_gravity && !desc.is_static,
            one_way: desc.one_way,
        })
    }

    pub fn half_extents(&self) -> Vec2 {
        self.half_extents
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::new(self.position, self.half_extents)
    }

    pub fn bottom(&self) -> f32 {
        self.position.y - self.half_extents.y
    }

    pub fn top(&self) -> f32 {
        self.position.y + self.half_extents.y
    }

    /// Swaps the box size keeping the bottom edge where it was.
    pub fn resize_keeping_bottom(&mut self, half_extents: Vec2) -> Result<(), BodyError> {
        validate_extents(half_extents)?;
        let bottom = self.bottom();
        self.half_extents = half_extents;
        self.position.y = bottom + half_extents.y;
        Ok(())
    }

    /// Removes the body from every collision and contact test.
    pub fn disable_collisions(&mut self) {
        self.category = CollisionLayers::NONE;
        self.collision_mask = CollisionLayers::NONE;
        self.contact_mask = CollisionLayers::NONE;
    }
}

fn validate_extents(half_extents: Vec2) -> Result<(), BodyError> {
    let valid = half_extents.is_finite() && half_extents.x > 0.0 && half_extents.y > 0.0;
    if valid {
        Ok(())
    } else {
        Err(BodyError::DegenerateExtents {
            x: half_extents.x,
            y: half_extents.y,
        })
    }
}
