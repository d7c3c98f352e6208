use miego_engine::{BodyDesc, BodyError, CollisionLayers, PhysicsBody, Vec2};
use serde::Serialize;
use tracing::warn;

use crate::collision::layers;
use crate::config::{EnemyTuning, Size};

use super::projectile::ShotKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    Walker,
    ShellWalker,
    Stationary,
    Shooter(ShotKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyState {
    Walking,
    Shelled,
    ShellMoving,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathStyle {
    /// Squashed in place, then removed after a short settle.
    Flattened,
    /// Popped up and dropped through the floor.
    KnockedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StompOutcome {
    Killed,
    Shelled,
    Kicked,
    Stopped,
    /// The enemy cannot be stomped; the touch counts as damage.
    NotStompable,
    Ignored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnemyUpdate {
    pub shot: Option<ShotKind>,
    pub expired: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    kind: EnemyKind,
    state: EnemyState,
    direction: f32,
    shoot_timer: f32,
    death_timer: f32,
    kick_grace: f32,
    death_style: Option<DeathStyle>,
}

impl Enemy {
    /// Builds the enemy standing with its feet at `feet`, facing left.
    pub fn spawn(
        kind: EnemyKind,
        feet: Vec2,
        tuning: &EnemyTuning,
    ) -> Result<(Self, PhysicsBody), BodyError> {
        let half = size_for(kind, tuning).half_extents();
        let mut body = PhysicsBody::new(
            feet + Vec2::new(0.0, half.y),
            BodyDesc::dynamic(half, layers::ENEMY),
        )?;
        apply_layers(&mut body, EnemyState::Walking);
        let enemy = Self {
            kind,
            state: EnemyState::Walking,
            direction: -1.0,
            shoot_timer: tuning.shoot_interval_seconds,
            death_timer: 0.0,
            kick_grace: 0.0,
            death_style: None,
        };
        Ok((enemy, body))
    }

    pub fn kind(&self) -> EnemyKind {
        self.kind
    }

    pub fn state(&self) -> EnemyState {
        self.state
    }

    pub fn direction(&self) -> f32 {
        self.direction
    }

    pub fn death_style(&self) -> Option<DeathStyle> {
        self.death_style
    }

    pub fn is_dead(&self) -> bool {
        self.state == EnemyState::Dead
    }

    pub fn can_damage_player(&self) -> bool {
        match self.state {
            EnemyState::Walking => true,
            EnemyState::ShellMoving => self.kick_grace <= 0.0,
            EnemyState::Shelled | EnemyState::Dead => false,
        }
    }

    /// Applies a stomp from an actor on the side opposite `away_direction`.
    pub fn on_stomp(
        &mut self,
        body: &mut PhysicsBody,
        away_direction: f32,
        tuning: &EnemyTuning,
    ) -> StompOutcome {
        match (self.kind, self.state) {
            (_, EnemyState::Dead) => StompOutcome::Ignored,
            (EnemyKind::Stationary, _) => StompOutcome::NotStompable,
            (EnemyKind::ShellWalker, EnemyState::Walking) => {
                self.state = EnemyState::Shelled;
                body.velocity.x = 0.0;
                if let Err(error) = body.resize_keeping_bottom(tuning.shell_size.half_extents()) {
                    warn!(%error, "shell_resize_rejected");
                }
                apply_layers(body, EnemyState::Shelled);
                StompOutcome::Shelled
            }
            (EnemyKind::ShellWalker, EnemyState::Shelled) => {
                self.kick(body, away_direction, tuning);
                StompOutcome::Kicked
            }
            (EnemyKind::ShellWalker, EnemyState::ShellMoving) => {
                self.state = EnemyState::Shelled;
                body.velocity.x = 0.0;
                apply_layers(body, EnemyState::Shelled);
                StompOutcome::Stopped
            }
            _ => {
                self.kill(body, DeathStyle::Flattened, tuning);
                StompOutcome::Killed
            }
        }
    }

    /// Sends a resting shell sliding. Returns false for anything else.
    pub fn kick(&mut self, body: &mut PhysicsBody, direction: f32, tuning: &EnemyTuning) -> bool {
        if self.state != EnemyState::Shelled {
            return false;
        }
        self.state = EnemyState::ShellMoving;
        self.direction = if direction < 0.0 { -1.0 } else { 1.0 };
        self.kick_grace = tuning.kick_grace_seconds;
        body.velocity.x = tuning.shell_speed * self.direction;
        apply_layers(body, EnemyState::ShellMoving);
        true
    }

    /// Returns false if the enemy was already dead.
    pub fn kill(&mut self, body: &mut PhysicsBody, style: DeathStyle, tuning: &EnemyTuning) -> bool {
        if self.state == EnemyState::Dead {
            return false;
        }
        self.state = EnemyState::Dead;
        self.death_style = Some(style);
        body.disable_collisions();
        match style {
            DeathStyle::Flattened => {
                body.velocity = Vec2::ZERO;
                body.affected_by_gravity = false;
                self.death_timer = tuning.settle_seconds;
            }
            DeathStyle::KnockedOut => {
                body.velocity = Vec2::new(0.0, tuning.knockout_pop_speed);
                body.affected_by_gravity = true;
                self.death_timer = tuning.knockout_seconds;
            }
        }
        true
    }

    pub fn reverse(&mut self) {
        if matches!(self.state, EnemyState::Walking | EnemyState::ShellMoving) {
            self.direction = -self.direction;
        }
    }

    /// Where a shooter's projectile appears, ahead of it along its facing.
    pub fn shot_origin(&self, body: &PhysicsBody, offset: Vec2) -> Vec2 {
        body.position + Vec2::new(offset.x * self.direction, offset.y)
    }

    /// Advances timers and sets this tick's horizontal velocity.
    pub fn update(&mut self, body: &mut PhysicsBody, dt_seconds: f32, tuning: &EnemyTuning) -> EnemyUpdate {
        let mut update = EnemyUpdate::default();
        self.kick_grace = (self.kick_grace - dt_seconds).max(0.0);
        match self.state {
            EnemyState::Walking => {
                let speed = match self.kind {
                    EnemyKind::Walker | EnemyKind::ShellWalker => tuning.walk_speed,
                    EnemyKind::Shooter(_) => tuning.shooter_walk_speed,
                    EnemyKind::Stationary => 0.0,
                };
                body.velocity.x = speed * self.direction;
                if let EnemyKind::Shooter(shot) = self.kind {
                    self.shoot_timer -= dt_seconds;
                    if self.shoot_timer <= 0.0 {
                        self.shoot_timer += tuning.shoot_interval_seconds;
                        update.shot = Some(shot);
                    }
                }
            }
            EnemyState::Shelled => body.velocity.x = 0.0,
            EnemyState::ShellMoving => body.velocity.x = tuning.shell_speed * self.direction,
            EnemyState::Dead => {
                self.death_timer -= dt_seconds;
                update.expired = self.death_timer <= 0.0;
            }
        }
        update
    }
}

fn size_for(kind: EnemyKind, tuning: &EnemyTuning) -> Size {
    match kind {
        EnemyKind::Walker => tuning.walker_size,
        EnemyKind::ShellWalker => tuning.shell_walker_size,
        EnemyKind::Stationary => tuning.stationary_size,
        EnemyKind::Shooter(_) => tuning.shooter_size,
    }
}

/// Keeps the body's layers in step with the behaviour state.
fn apply_layers(body: &mut PhysicsBody, state: EnemyState) {
    let (category, contact_mask) = match state {
        EnemyState::Walking | EnemyState::Shelled => (
            layers::ENEMY,
            layers::PLAYER | layers::FIREBALL | layers::SHELL,
        ),
        EnemyState::ShellMoving => (
            layers::ENEMY | layers::SHELL,
            layers::PLAYER | layers::FIREBALL | layers::ENEMY,
        ),
        EnemyState::Dead => (CollisionLayers::NONE, CollisionLayers::NONE),
    };
    body.category = category;
    body.contact_mask = contact_mask;
    body.collision_mask = if state == EnemyState::Dead {
        CollisionLayers::NONE
    } else {
        layers::TERRAIN
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn spawn(kind: EnemyKind) -> (Enemy, PhysicsBody, EnemyTuning) {
        let tuning = EnemyTuning::default();
        let (enemy, body) = Enemy::spawn(kind, Vec2::new(200.0, 64.0), &tuning).expect("enemy");
        (enemy, body, tuning)
    }

    #[test]
    fn walker_dies_on_first_stomp_and_leaves_contact_tests() {
        let (mut enemy, mut body, tuning) = spawn(EnemyKind::Walker);
        assert_eq!(body.bottom(), 64.0);
        assert_eq!(enemy.on_stomp(&mut body, 1.0, &tuning), StompOutcome::Killed);
        assert!(enemy.is_dead());
        assert!(body.category.is_empty());
        assert!(body.contact_mask.is_empty());
        assert_eq!(enemy.on_stomp(&mut body, 1.0, &tuning), StompOutcome::Ignored);
    }

    #[test]
    fn shell_walker_cycles_through_shell_states() {
        let (mut enemy, mut body, tuning) = spawn(EnemyKind::ShellWalker);
        assert_eq!(enemy.on_stomp(&mut body, 1.0, &tuning), StompOutcome::Shelled);
        assert_eq!(body.half_extents(), tuning.shell_size.half_extents());
        assert_eq!(body.bottom(), 64.0);
        assert!(!enemy.can_damage_player());

        assert_eq!(enemy.on_stomp(&mut body, -1.0, &tuning), StompOutcome::Kicked);
        assert_eq!(enemy.state(), EnemyState::ShellMoving);
        assert_eq!(body.velocity.x, -tuning.shell_speed);
        assert!(body.category.contains(layers::SHELL));
        assert!(!enemy.can_damage_player());
        for _ in 0..20 {
            enemy.update(&mut body, DT, &tuning);
        }
        assert!(enemy.can_damage_player());

        assert_eq!(enemy.on_stomp(&mut body, 1.0, &tuning), StompOutcome::Stopped);
        assert_eq!(enemy.state(), EnemyState::Shelled);
        assert_eq!(body.velocity.x, 0.0);
    }

    #[test]
    fn stationary_enemies_cannot_be_stomped() {
        let (mut enemy, mut body, tuning) = spawn(EnemyKind::Stationary);
        assert_eq!(
            enemy.on_stomp(&mut body, 1.0, &tuning),
            StompOutcome::NotStompable
        );
        assert!(!enemy.is_dead());
        enemy.update(&mut body, DT, &tuning);
        assert_eq!(body.velocity.x, 0.0);
    }

    #[test]
    fn shooter_fires_on_its_interval() {
        let (mut enemy, mut body, tuning) = spawn(EnemyKind::Shooter(ShotKind::Flame));
        let shots = (0..(60.0 * 5.1) as usize)
            .filter_map(|_| enemy.update(&mut body, DT, &tuning).shot)
            .count();
        assert_eq!(shots, 2);
        assert_eq!(body.velocity.x, -tuning.shooter_walk_speed);
        assert_eq!(
            enemy.shot_origin(&body, Vec2::new(30.0, 20.0)),
            body.position + Vec2::new(-30.0, 20.0)
        );
    }

    #[test]
    fn dead_enemies_expire_after_their_death_animation() {
        let (mut enemy, mut body, tuning) = spawn(EnemyKind::Walker);
        assert!(enemy.kill(&mut body, DeathStyle::KnockedOut, &tuning));
        assert!(!enemy.kill(&mut body, DeathStyle::Flattened, &tuning));
        assert_eq!(body.velocity.y, tuning.knockout_pop_speed);
        assert!(body.collision_mask.is_empty());

        let ticks = (1..500)
            .find(|_| enemy.update(&mut body, DT, &tuning).expired)
            .expect("expires");
        assert!((71..=73).contains(&ticks));
    }

    #[test]
    fn walls_turn_walkers_around() {
        let (mut enemy, mut body, tuning) = spawn(EnemyKind::Walker);
        enemy.update(&mut body, DT, &tuning);
        assert_eq!(body.velocity.x, -tuning.walk_speed);
        enemy.reverse();
        enemy.update(&mut body, DT, &tuning);
        assert_eq!(body.velocity.x, tuning.walk_speed);
    }
}
