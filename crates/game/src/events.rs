use std::fmt;

use miego_engine::Vec2;
use serde::Serialize;
use tracing::{debug, info};

use crate::entity::{DeathCause, EnemyKind, ItemKind, PowerForm};

/// Discrete things that happened during a tick, for HUD, audio and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    CoinCollected { coins: u32, points: u64 },
    PowerUpCollected { kind: ItemKind },
    EnemyStomped { kind: EnemyKind, multiplier: u32 },
    EnemyDefeated { kind: EnemyKind, points: u64, position: Vec2 },
    PlayerDamaged { form: PowerForm },
    PlayerFrozen,
    PlayerDied { cause: DeathCause },
    ExtraLifeAwarded { lives: u32 },
    TimeExpired,
    LevelComplete { level: u32, time_bonus: u64 },
    GameOver { score: u64 },
    BlockBumped { position: Vec2 },
    BlockBroken { position: Vec2 },
    ItemSpawned { kind: ItemKind, position: Vec2 },
    FireballShot,
}

pub trait GameEventObserver {
    fn on_event(&mut self, event: &GameEvent);
}

/// Logs lifecycle events at info and everything else at debug.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl GameEventObserver for TracingObserver {
    fn on_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::PlayerDied { cause } => info!(?cause, "player_died"),
            GameEvent::LevelComplete { level, time_bonus } => {
                info!(level, time_bonus, "level_complete")
            }
            GameEvent::GameOver { score } => info!(score, "game_over"),
            GameEvent::ExtraLifeAwarded { lives } => info!(lives, "extra_life_awarded"),
            GameEvent::TimeExpired => info!("time_expired"),
            other => debug!(event = ?other, "game_event"),
        }
    }
}

/// Collects events during a tick and hands them to observers once, at the
/// end of it.
#[derive(Default)]
pub struct GameEventBus {
    pending: Vec<GameEvent>,
    last_tick: Vec<GameEvent>,
    observers: Vec<Box<dyn GameEventObserver>>,
}

impl fmt::Debug for GameEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameEventBus")
            .field("pending", &self.pending)
            .field("last_tick", &self.last_tick)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl GameEventBus {
    pub fn subscribe(&mut self, observer: Box<dyn GameEventObserver>) {
        self.observers.push(observer);
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.pending.push(event);
    }

    pub fn pending(&self) -> &[GameEvent] {
        &self.pending
    }

    /// Delivers this tick's events and keeps them as `last_tick_events`.
    pub fn dispatch(&mut self) {
        self.last_tick = std::mem::take(&mut self.pending);
        for event in &self.last_tick {
            for observer in &mut self.observers {
                observer.on_event(event);
            }
        }
    }

    pub fn last_tick_events(&self) -> &[GameEvent] {
        &self.last_tick
    }

    /// Drops queued and remembered events; observers stay subscribed.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.last_tick.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    struct Recorder(Rc<RefCell<Vec<GameEvent>>>);

    impl GameEventObserver for Recorder {
        fn on_event(&mut self, event: &GameEvent) {
            self.0.borrow_mut().push(event.clone());
        }
    }

    #[test]
    fn observers_see_each_event_once_at_dispatch() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = GameEventBus::default();
        bus.subscribe(Box::new(Recorder(Rc::clone(&seen))));

        bus.emit(GameEvent::FireballShot);
        bus.emit(GameEvent::TimeExpired);
        assert!(seen.borrow().is_empty());

        bus.dispatch();
        assert_eq!(
            *seen.borrow(),
            vec![GameEvent::FireballShot, GameEvent::TimeExpired]
        );
        assert_eq!(bus.last_tick_events().len(), 2);
        assert!(bus.pending().is_empty());

        bus.dispatch();
        assert_eq!(seen.borrow().len(), 2);
        assert!(bus.last_tick_events().is_empty());
    }

    #[test]
    fn events_serialize_with_a_tag() {
        let json = serde_json::to_value(GameEvent::CoinCollected {
            coins: 3,
            points: 200,
        })
        .expect("json");
        assert_eq!(json["event"], "coin_collected");
        assert_eq!(json["coins"], 3);
    }
}
