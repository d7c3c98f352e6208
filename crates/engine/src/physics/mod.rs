//! Kinematic 2D physics for tile-scale platformers.
//!
//! Bodies are axis-aligned boxes. Static solids live in a [`StaticIndex`] and
//! are resolved against with [`move_and_collide`]; everything else meets in
//! [`detect_overlaps`], which only reports contacts and never pushes bodies.

mod body;
mod contacts;
mod integrator;
mod sweep;

pub use body::{Aabb, BodyDesc, BodyError, CollisionLayers, PhysicsBody, CONTACT_EPSILON};
pub use contacts::{detect_overlaps, Contact, ContactKey, ContactProbe, ContactTracker, SupportContacts};
pub use integrator::{accelerate_toward, apply_gravity, clamp_step_seconds, Gravity};
pub use sweep::{move_and_collide, Solid, StaticIndex, SweepHit};
