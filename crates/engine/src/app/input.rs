use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    Jump,
    Shoot,
    Pause,
    Quit,
}

const ACTION_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::Jump => 2,
            InputAction::Shoot => 3,
            InputAction::Pause => 4,
            InputAction::Quit => 5,
        }
    }
}

/// Input sampled once per fixed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    movement_axis: f32,
    jump_pressed: bool,
    shoot_pressed: bool,
    pause_pressed: bool,
    quit_requested: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Horizontal axis in `[-1, 1]`.
    pub fn movement_axis(&self) -> f32 {
        self.movement_axis
    }

    pub fn jump_pressed(&self) -> bool {
        self.jump_pressed
    }

    pub fn shoot_pressed(&self) -> bool {
        self.shoot_pressed
    }

    pub fn pause_pressed(&self) -> bool {
        self.pause_pressed
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn with_movement_axis(mut self, axis: f32) -> Self {
        self.movement_axis = clamp_axis(axis);
        self
    }

    pub fn with_jump_pressed(mut self, pressed: bool) -> Self {
        self.jump_pressed = pressed;
        self
    }

    pub fn with_shoot_pressed(mut self, pressed: bool) -> Self {
        self.shoot_pressed = pressed;
        self
    }

    pub fn with_pause_pressed(mut self, pressed: bool) -> Self {
        self.pause_pressed = pressed;
        self
    }

    pub fn with_quit_requested(mut self, requested: bool) -> Self {
        self.quit_requested = requested;
        self
    }
}

fn clamp_axis(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(-1.0, 1.0)
}

/// Drag-to-move: horizontal distance from the touch origin scales the axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragMapping {
    pub dead_zone: f32,
    pub max_distance: f32,
    pub min_magnitude: f32,
}

impl Default for DragMapping {
    fn default() -> Self {
        Self {
            dead_zone: 20.0,
            max_distance: 120.0,
            min_magnitude: 0.3,
        }
    }
}

impl DragMapping {
    pub fn axis(&self, drag_dx: f32) -> f32 {
        let distance = drag_dx.abs();
        if !distance.is_finite() || distance < self.dead_zone {
            return 0.0;
        }
        let ratio = (distance / self.max_distance.max(f32::EPSILON)).min(1.0);
        let magnitude = self.min_magnitude + ratio * (1.0 - self.min_magnitude);
        clamp_axis(magnitude.copysign(drag_dx))
    }
}

/// Fixed screen zones: the movement zone is split into a left and a right half.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneMapping {
    pub movement_zone_fraction: f32,
}

impl Default for ZoneMapping {
    fn default() -> Self {
        Self {
            movement_zone_fraction: 0.5,
        }
    }
}

impl ZoneMapping {
    pub fn axis(&self, touch_x: f32, viewport_width: f32) -> f32 {
        let zone_width = viewport_width * self.movement_zone_fraction;
        if touch_x < zone_width * 0.5 {
            -1.0
        } else if touch_x < zone_width {
            1.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TouchMapping {
    Drag(DragMapping),
    Zones(ZoneMapping),
}

impl Default for TouchMapping {
    fn default() -> Self {
        TouchMapping::Drag(DragMapping::default())
    }
}

/// Buffers device input between ticks. Continuous axes keep the last applied
/// value; discrete presses are edges cleared by `snapshot_for_tick`.
#[derive(Debug, Default)]
pub struct InputCollector {
    action_states: ActionStates,
    movement_axis: f32,
    jump_pressed_edge: bool,
    shoot_pressed_edge: bool,
    pause_pressed_edge: bool,
    quit_requested: bool,
    touch_mapping: TouchMapping,
}

impl InputCollector {
    pub fn new(touch_mapping: TouchMapping) -> Self {
        Self {
            touch_mapping,
            ..Self::default()
        }
    }

    pub fn set_movement_axis(&mut self, value: f32) {
        self.movement_axis = clamp_axis(value);
    }

    pub fn trigger_jump(&mut self) {
        self.jump_pressed_edge = true;
    }

    pub fn trigger_shoot(&mut self) {
        self.shoot_pressed_edge = true;
    }

    pub fn trigger_pause(&mut self) {
        self.pause_pressed_edge = true;
    }

    pub fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    /// Digital (keyboard-style) state change.
    pub fn set_action(&mut self, action: InputAction, is_down: bool) {
        let was_down = self.action_states.is_down(action);
        self.action_states.set(action, is_down);
        let pressed = is_down && !was_down;

        match action {
            InputAction::MoveLeft | InputAction::MoveRight => {
                self.movement_axis = if pressed {
                    if action == InputAction::MoveLeft {
                        -1.0
                    } else {
                        1.0
                    }
                } else {
                    self.digital_axis()
                };
            }
            InputAction::Jump => self.jump_pressed_edge |= pressed,
            InputAction::Shoot => self.shoot_pressed_edge |= pressed,
            InputAction::Pause => self.pause_pressed_edge |= pressed,
            InputAction::Quit => self.quit_requested |= is_down,
        }
    }

    /// Touch movement through the configured mapping strategy.
    pub fn pointer_moved(&mut self, origin_x: f32, current_x: f32, viewport_width: f32) {
        let axis = match self.touch_mapping {
            TouchMapping::Drag(drag) => drag.axis(current_x - origin_x),
            TouchMapping::Zones(zones) => zones.axis(current_x, viewport_width),
        };
        self.movement_axis = axis;
    }

    pub fn pointer_released(&mut self) {
        self.movement_axis = self.digital_axis();
    }

    pub fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot {
            movement_axis: self.movement_axis,
            jump_pressed: self.jump_pressed_edge,
            shoot_pressed: self.shoot_pressed_edge,
            pause_pressed: self.pause_pressed_edge,
            quit_requested: self.quit_requested,
        };
        self.jump_pressed_edge = false;
        self.shoot_pressed_edge = false;
        self.pause_pressed_edge = false;
        snapshot
    }

    fn digital_axis(&self) -> f32 {
        let left = self.action_states.is_down(InputAction::MoveLeft);
        let right = self.action_states.is_down(InputAction::MoveRight);
        match (left, right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}
