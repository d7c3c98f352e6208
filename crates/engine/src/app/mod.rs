mod input;
mod loop_runner;
mod metrics;
mod scene;

pub use input::{
    DragMapping, InputAction, InputCollector, InputSnapshot, TouchMapping, ZoneMapping,
};
pub use loop_runner::{run_headless, FixedStepClock, LoopConfig, RunSummary, StepPlan};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use scene::{
    EntityId, EntityIdAllocator, Scene, SceneCommand, SceneRunner, SceneWorld,
};
