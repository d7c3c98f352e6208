pub mod app;
pub mod grid;
pub mod math;
pub mod physics;

pub use app::{
    run_headless, DragMapping, EntityId, EntityIdAllocator, FixedStepClock, InputAction,
    InputCollector, InputSnapshot, LoopConfig, LoopMetricsSnapshot, MetricsHandle, RunSummary,
    Scene, SceneCommand, SceneRunner, SceneWorld, StepPlan, TouchMapping, ZoneMapping,
};
pub use grid::{Grid, GridError};
pub use math::{approach, Vec2};
pub use physics::{
    accelerate_toward, apply_gravity, clamp_step_seconds, detect_overlaps, move_and_collide, Aabb,
    BodyDesc, BodyError, CollisionLayers, Contact, ContactKey, ContactProbe, ContactTracker,
    Gravity, PhysicsBody, Solid, StaticIndex, SupportContacts, SweepHit, CONTACT_EPSILON,
};
