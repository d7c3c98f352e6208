use miego_engine::{
    accelerate_toward, BodyDesc, BodyError, ContactKey, EntityId, PhysicsBody,
    SupportContacts, Vec2,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::collision::layers;
use crate::config::PlayerTuning;

use super::item::ItemKind;

/// The size-and-ability part of the player's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerForm {
    Small,
    Big,
    Fire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Small,
    Big,
    Fire,
    Invincible,
    Dead,
}

impl From<PowerForm> for PlayerState {
    fn from(form: PowerForm) -> Self {
        match form {
            PowerForm::Small => PlayerState::Small,
            PowerForm::Big => PlayerState::Big,
            PowerForm::Fire => PlayerState::Fire,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Damage,
    Hazard,
    Fall,
    TimeExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Invincible, invulnerable or already dead.
    Ignored,
    PoweredDown(PowerForm),
    Died,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Ground,
    Air,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

/// The player character. Lives for a whole level session; respawning
/// resets it in place.
#[derive(Debug, Clone)]
pub struct Player {
    id: EntityId,
    pub body: PhysicsBody,
    tuning: PlayerTuning,
    state: PlayerState,
    /// Form to return to when the star runs out; only read while invincible.
    restore_form: PowerForm,
    facing: Facing,
    grounded: bool,
    support: SupportContacts,
    left_ground_by_jump: bool,
    air_jumps_remaining: u32,
    coyote_timer: f32,
    invulnerable_timer: f32,
    star_timer: f32,
    freeze_timer: f32,
    blink_clock: f32,
    death_cause: Option<DeathCause>,
}

impl Player {
    /// Builds a small player standing with its feet at `feet`.
    pub fn new(id: EntityId, feet: Vec2, tuning: &PlayerTuning) -> Result<Self, BodyError> {
        let half = tuning.small_size.half_extents();
        let body = PhysicsBody::new(feet + Vec2::new(0.0, half.y), player_desc(half))?;
        Ok(Self {
            id,
            body,
            tuning: tuning.clone(),
            state: PlayerState::Small,
            restore_form: PowerForm::Small,
            facing: Facing::Right,
            grounded: false,
            support: SupportContacts::default(),
            left_ground_by_jump: false,
            air_jumps_remaining: tuning.max_air_jumps,
            coyote_timer: 0.0,
            invulnerable_timer: 0.0,
            star_timer: 0.0,
            freeze_timer: 0.0,
            blink_clock: 0.0,
            death_cause: None,
        })
    }

    /// Back to a fresh small player at `feet`, keeping the same id.
    pub fn respawn(&mut self, feet: Vec2) -> Result<(), BodyError> {
        *self = Self::new(self.id, feet, &self.tuning)?;
        Ok(())
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Current size and ability, looking through the star overlay.
    pub fn form(&self) -> PowerForm {
        match self.state {
            PlayerState::Small | PlayerState::Dead => PowerForm::Small,
            PlayerState::Big => PowerForm::Big,
            PlayerState::Fire => PowerForm::Fire,
            PlayerState::Invincible => self.restore_form,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.state == PlayerState::Dead
    }

    pub fn is_invincible(&self) -> bool {
        self.state == PlayerState::Invincible
    }

    pub fn is_big(&self) -> bool {
        self.form() != PowerForm::Small
    }

    pub fn can_shoot(&self) -> bool {
        !self.is_dead() && self.form() == PowerForm::Fire
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze_timer > 0.0
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn air_jumps_remaining(&self) -> u32 {
        self.air_jumps_remaining
    }

    pub fn death_cause(&self) -> Option<DeathCause> {
        self.death_cause
    }

    /// Flashing after a hit, or while the star is about to run out.
    pub fn is_blinking(&self) -> bool {
        if self.is_dead() {
            return false;
        }
        self.invulnerable_timer > 0.0
            || (self.is_invincible() && self.star_timer <= self.tuning.star_warning_seconds)
    }

    /// Which half of the blink cycle the player is in; always true when not
    /// blinking.
    pub fn is_visible(&self) -> bool {
        if !self.is_blinking() || self.tuning.blink_interval_seconds <= 0.0 {
            return true;
        }
        (self.blink_clock / self.tuning.blink_interval_seconds) as u32 % 2 == 0
    }

    pub fn tick_timers(&mut self, dt_seconds: f32) {
        self.blink_clock += dt_seconds;
        self.coyote_timer = (self.coyote_timer - dt_seconds).max(0.0);
        self.invulnerable_timer = (self.invulnerable_timer - dt_seconds).max(0.0);
        self.freeze_timer = (self.freeze_timer - dt_seconds).max(0.0);
        if self.state == PlayerState::Invincible {
            self.star_timer -= dt_seconds;
            if self.star_timer <= 0.0 {
                self.star_timer = 0.0;
                self.state = self.restore_form.into();
                debug!(state = ?self.state, "star_power_ended");
            }
        }
    }

    /// Steers toward the speed the movement axis asks for.
    pub fn apply_movement(&mut self, axis: f32, dt_seconds: f32) {
        if self.is_dead() {
            return;
        }
        let axis = axis.clamp(-1.0, 1.0);
        if axis < 0.0 {
            self.facing = Facing::Left;
        } else if axis > 0.0 {
            self.facing = Facing::Right;
        }
        let tuning = &self.tuning;
        let (speed, acceleration, deceleration) = if self.grounded {
            (
                tuning.ground_speed,
                tuning.ground_acceleration,
                tuning.ground_deceleration,
            )
        } else {
            (
                tuning.air_speed,
                tuning.air_acceleration,
                tuning.air_deceleration,
            )
        };
        let multiplier = if self.is_frozen() {
            tuning.freeze_speed_multiplier
        } else {
            1.0
        };
        let target = axis * speed * multiplier;
        self.body.velocity.x = accelerate_toward(
            self.body.velocity.x,
            target,
            acceleration,
            deceleration,
            dt_seconds,
        );
    }

    /// Ground jump when standing or inside the coyote window, otherwise an
    /// air jump if any are left.
    pub fn try_jump(&mut self) -> Option<JumpKind> {
        if self.is_dead() {
            return None;
        }
        if self.grounded || self.coyote_timer > 0.0 {
            self.body.velocity.y = self.tuning.low_jump_impulse;
            self.air_jumps_remaining = self.tuning.max_air_jumps;
            self.coyote_timer = 0.0;
            self.grounded = false;
            self.left_ground_by_jump = true;
            return Some(JumpKind::Ground);
        }
        if self.air_jumps_remaining > 0 {
            self.air_jumps_remaining -= 1;
            self.body.velocity.y = self.tuning.air_jump_impulse;
            return Some(JumpKind::Air);
        }
        None
    }

    pub fn begin_support(&mut self, key: ContactKey) -> bool {
        self.support.begin(key)
    }

    pub fn end_support(&mut self, key: ContactKey) -> bool {
        self.support.end(key)
    }

    /// Recomputes the grounded flag after this tick's contacts were applied.
    /// Returns true on the tick the player lands.
    pub fn refresh_grounded(&mut self) -> bool {
        let was_grounded = self.grounded;
        self.grounded = self.support.is_supported()
            && self.body.velocity.y <= self.tuning.landing_velocity_threshold;
        if self.grounded {
            self.air_jumps_remaining = self.tuning.max_air_jumps;
            self.left_ground_by_jump = false;
            self.coyote_timer = 0.0;
        } else if was_grounded && !self.left_ground_by_jump {
            self.coyote_timer = self.tuning.coyote_seconds;
        }
        self.grounded && !was_grounded
    }

    /// Upward kick after a successful stomp.
    pub fn bounce(&mut self) {
        self.body.velocity.y = self.tuning.stomp_bounce_speed;
        self.grounded = false;
    }

    pub fn take_damage(&mut self) -> DamageOutcome {
        if self.is_dead() || self.is_invincible() || self.invulnerable_timer > 0.0 {
            return DamageOutcome::Ignored;
        }
        match self.state {
            PlayerState::Fire => {
                self.state = PlayerState::Big;
                self.invulnerable_timer = self.tuning.invulnerability_seconds;
                DamageOutcome::PoweredDown(PowerForm::Big)
            }
            PlayerState::Big => {
                self.state = PlayerState::Small;
                self.resize_for(PowerForm::Small);
                self.invulnerable_timer = self.tuning.invulnerability_seconds;
                DamageOutcome::PoweredDown(PowerForm::Small)
            }
            PlayerState::Small => {
                self.die(DeathCause::Damage);
                DamageOutcome::Died
            }
            PlayerState::Invincible | PlayerState::Dead => DamageOutcome::Ignored,
        }
    }

    /// Instant death. Hazards are shrugged off while invincible; falls and
    /// time expiry are not. Returns true if the player died.
    pub fn kill(&mut self, cause: DeathCause) -> bool {
        if self.is_dead() || (cause == DeathCause::Hazard && self.is_invincible()) {
            return false;
        }
        self.die(cause);
        true
    }

    fn die(&mut self, cause: DeathCause) {
        self.state = PlayerState::Dead;
        self.death_cause = Some(cause);
        self.restore_form = PowerForm::Small;
        self.star_timer = 0.0;
        self.invulnerable_timer = 0.0;
        self.grounded = false;
        self.support.clear();
        self.body.disable_collisions();
        self.body.affected_by_gravity = true;
        self.body.velocity = Vec2::new(0.0, self.tuning.death_pop_speed);
        debug!(?cause, "player_died");
    }

    /// Applies a power-up. Returns false if it changed nothing.
    pub fn collect(&mut self, kind: ItemKind) -> bool {
        if self.is_dead() {
            return false;
        }
        match kind {
            ItemKind::Mushroom => self.upgrade_to(PowerForm::Big),
            ItemKind::FireFlower => self.upgrade_to(PowerForm::Fire),
            ItemKind::Star => {
                if !self.is_invincible() {
                    self.restore_form = self.form();
                    self.state = PlayerState::Invincible;
                }
                self.star_timer = self.tuning.star_seconds;
                true
            }
            ItemKind::Coin | ItemKind::ExtraLife => false,
        }
    }

    /// Forms only move up: a mushroom does nothing to a Fire player.
    fn upgrade_to(&mut self, target: PowerForm) -> bool {
        let current = self.form();
        let target = match (current, target) {
            (PowerForm::Fire, _) | (PowerForm::Big, PowerForm::Big) => return false,
            (_, target) => target,
        };
        if current == PowerForm::Small {
            self.resize_for(target);
        }
        if self.is_invincible() {
            self.restore_form = target;
        } else {
            self.state = target.into();
        }
        debug!(from = ?current, to = ?target, "player_powered_up");
        true
    }

    fn resize_for(&mut self, form: PowerForm) {
        let size = match form {
            PowerForm::Small => self.tuning.small_size,
            PowerForm::Big | PowerForm::Fire => self.tuning.big_size,
        };
        if let Err(error) = self.body.resize_keeping_bottom(size.half_extents()) {
            warn!(%error, "player_resize_rejected");
        }
    }

    pub fn freeze(&mut self) {
        if !self.is_dead() {
            self.freeze_timer = self.tuning.freeze_seconds;
        }
    }

    /// Keeps the player inside the level's horizontal span.
    pub fn clamp_to_width(&mut self, world_width: f32) {
        let half = self.body.half_extents().x;
        let clamped = self.body.position.x.clamp(half, (world_width - half).max(half));
        if clamped != self.body.position.x {
            self.body.position.x = clamped;
            self.body.velocity.x = 0.0;
        }
    }

    /// Point a fireball starts from.
    pub fn muzzle(&self) -> Vec2 {
        let half = self.body.half_extents();
        self.body.position + Vec2::new(half.x * self.facing.sign(), half.y * 0.25)
    }
}

fn player_desc(half_extents: Vec2) -> BodyDesc {
    BodyDesc::dynamic(half_extents, layers::PLAYER)
        .with_collision_mask(layers::TERRAIN)
        .with_contact_mask(
            layers::ENEMY
                | layers::ITEM
                | layers::COIN
                | layers::FLAGPOLE
                | layers::DEATH_ZONE
                | layers::SHELL
                | layers::ENEMY_PROJECTILE,
        )
}
