//! Score, coins, lives, level timer and stomp combos. Pure rules; the
//! session turns the outcomes into events.

use serde::Serialize;

use crate::config::ScoringRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinOutcome {
    pub points: u64,
    pub extra_life: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StompScore {
    pub multiplier: u32,
    pub points: u64,
}

/// Stomps within the window of the first stomp in a chain escalate the
/// multiplier; a later stomp starts a new chain.
#[derive(Debug, Clone, Default, PartialEq)]
struct Combo {
    count: u32,
    chain_started_at: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HudValues {
    pub score: u64,
    pub coins: u32,
    pub lives: u32,
    pub seconds_left: u32,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    rules: ScoringRules,
    score: u64,
    coins: u32,
    lives: u32,
    level: u32,
    time_remaining: f32,
    time_expired: bool,
    level_completed: bool,
    combo: Combo,
}

impl GameState {
    pub fn new(rules: ScoringRules) -> Self {
        Self {
            score: 0,
            coins: 0,
            lives: rules.starting_lives,
            level: 1,
            time_remaining: rules.level_time_seconds,
            time_expired: false,
            level_completed: false,
            combo: Combo::default(),
            rules,
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn coins(&self) -> u32 {
        self.coins
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn time_remaining(&self) -> f32 {
        self.time_remaining
    }

    /// Remaining time rounded up, as a HUD shows it.
    pub fn seconds_left(&self) -> u32 {
        self.time_remaining.max(0.0).ceil() as u32
    }

    pub fn is_game_over(&self) -> bool {
        self.lives == 0
    }

    pub fn is_level_completed(&self) -> bool {
        self.level_completed
    }

    pub fn combo_multiplier(&self) -> u32 {
        self.combo.count.max(1)
    }

    pub fn hud(&self) -> HudValues {
        HudValues {
            score: self.score,
            coins: self.coins,
            lives: self.lives,
            seconds_left: self.seconds_left(),
            level: self.level,
        }
    }

    pub fn add_score(&mut self, points: u64) -> u64 {
        self.score = self.score.saturating_add(points);
        self.score
    }

    /// Every `coins_for_life` coins turn into a life; the rest carry over.
    pub fn collect_coin(&mut self) -> CoinOutcome {
        let points = self.rules.coin_points;
        self.add_score(points);
        self.coins += 1;
        let extra_life = self.coins >= self.rules.coins_for_life;
        if extra_life {
            self.coins -= self.rules.coins_for_life;
            self.add_life();
        }
        CoinOutcome { points, extra_life }
    }

    /// Scores a stomp made at `at` seconds of session time.
    pub fn add_stomp_score(&mut self, at: f64) -> StompScore {
        let in_chain = self
            .combo
            .chain_started_at
            .is_some_and(|start| at - start <= self.rules.combo_window_seconds);
        if in_chain {
            self.combo.count = (self.combo.count + 1).min(self.rules.max_combo_multiplier);
        } else {
            self.combo.count = 1;
            self.combo.chain_started_at = Some(at);
        }
        let multiplier = self.combo.count;
        let points = self.rules.stomp_points * u64::from(multiplier);
        self.add_score(points);
        StompScore { multiplier, points }
    }

    /// Returns true when that was the last life.
    pub fn lose_life(&mut self) -> bool {
        self.lives = self.lives.saturating_sub(1);
        self.is_game_over()
    }

    pub fn add_life(&mut self) {
        self.lives = self.lives.saturating_add(1);
    }

    /// Counts the level timer down. Returns true only on the tick the timer
    /// runs out.
    pub fn update_time(&mut self, dt_seconds: f32) -> bool {
        if self.time_expired || self.level_completed {
            return false;
        }
        self.time_remaining -= dt_seconds;
        if self.time_remaining > 0.0 {
            return false;
        }
        self.time_remaining = 0.0;
        self.time_expired = true;
        true
    }

    /// Pays the time bonus for every whole second left and stops the clock.
    /// A second call pays nothing.
    pub fn complete_level(&mut self) -> u64 {
        if self.level_completed {
            return 0;
        }
        self.level_completed = true;
        let whole_seconds = self.time_remaining.max(0.0).floor() as u64;
        let bonus = whole_seconds * self.rules.time_bonus_per_second;
        self.add_score(bonus);
        bonus
    }

    /// Fresh timer and combo for another attempt at the current level.
    pub fn reset_for_new_life(&mut self) {
        self.time_remaining = self.rules.level_time_seconds;
        self.time_expired = false;
        self.level_completed = false;
        self.combo = Combo::default();
    }

    /// Moves on to `level`, keeping score, coins and lives.
    pub fn start_level(&mut self, level: u32) {
        self.level = level.max(1);
        self.reset_for_new_life();
    }

    pub fn reset_for_new_game(&mut self) {
        *self = Self::new(self.rules.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameState {
        GameState::new(ScoringRules::default())
    }

    #[test]
    fn combo_multipliers_follow_the_chain_window() {
        let mut state = state();
        let multipliers: Vec<u32> = [0.0, 0.3, 0.7]
            .into_iter()
            .map(|at| state.add_stomp_score(at).multiplier)
            .collect();
        assert_eq!(multipliers, vec![1, 2, 1]);
        assert_eq!(state.score(), 100 + 200 + 100);
    }

    #[test]
    fn combo_multiplier_is_capped() {
        let mut state = GameState::new(ScoringRules {
            combo_window_seconds: 10.0,
            max_combo_multiplier: 3,
            ..ScoringRules::default()
        });
        let multipliers: Vec<u32> = (0..5)
            .map(|index| state.add_stomp_score(index as f64 * 0.1).multiplier)
            .collect();
        assert_eq!(multipliers, vec![1, 2, 3, 3, 3]);
    }

    #[test]
    fn exactly_coins_for_life_wraps_to_zero() {
        let mut state = state();
        let extra = (0..100).filter(|_| state.collect_coin().extra_life).count();
        assert_eq!(extra, 1);
        assert_eq!(state.coins(), 0);
        assert_eq!(state.lives(), 4);
    }

    #[test]
    fn one_past_coins_for_life_carries_the_remainder() {
        let mut state = state();
        for _ in 0..101 {
            state.collect_coin();
        }
        assert_eq!(state.coins(), 1);
        assert_eq!(state.lives(), 4);
        assert_eq!(state.score(), 101 * 200);
    }

    #[test]
    fn time_expiry_fires_exactly_once() {
        let mut state = GameState::new(ScoringRules {
            level_time_seconds: 1.0,
            ..ScoringRules::default()
        });
        let fired = (0..200).filter(|_| state.update_time(1.0 / 60.0)).count();
        assert_eq!(fired, 1);
        assert_eq!(state.time_remaining(), 0.0);

        state.reset_for_new_life();
        assert_eq!(state.time_remaining(), 1.0);
        let fired = (0..200).filter(|_| state.update_time(1.0 / 60.0)).count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn losing_the_last_life_is_game_over() {
        let mut state = state();
        assert!(!state.lose_life());
        assert!(!state.lose_life());
        assert!(state.lose_life());
        assert!(state.is_game_over());
        assert!(state.lose_life());
        assert_eq!(state.lives(), 0);
    }

    #[test]
    fn level_completion_pays_whole_seconds_once() {
        let mut state = state();
        state.update_time(0.5);
        assert_eq!(state.seconds_left(), 300);
        assert_eq!(state.complete_level(), 299 * 50);
        assert_eq!(state.complete_level(), 0);
        assert_eq!(state.score(), 299 * 50);
        assert!(!state.update_time(1000.0));
    }

    #[test]
    fn new_level_keeps_progress_and_new_game_clears_it() {
        let mut state = state();
        state.collect_coin();
        state.lose_life();
        state.complete_level();
        state.start_level(2);
        assert_eq!(state.level(), 2);
        assert_eq!(state.coins(), 1);
        assert_eq!(state.lives(), 2);
        assert!(!state.is_level_completed());
        assert_eq!(state.time_remaining(), 300.0);

        state.reset_for_new_game();
        assert_eq!(state.level(), 1);
        assert_eq!(state.score(), 0);
        assert_eq!(state.lives(), 3);
    }
}
