//! Difficulty scaling. Every level's generator layout is a pure function of
//! the level-1 layout and the level number.

use crate::config::LevelGenConfig;

pub const MAX_WALKERS: u32 = 5;
pub const MAX_SHOOTERS: u32 = 3;
pub const MAX_SHELL_WALKERS: u32 = 2;
pub const MAX_GAPS: u32 = 4;
pub const MAX_GAP_WIDTH: u32 = 4;
pub const MAX_COIN_ARCS: u32 = 5;
pub const MAX_SCATTERED_COINS: u32 = 8;
/// Level from which a star block is placed.
pub const STAR_FROM_LEVEL: u32 = 3;

/// Layout for `level`; levels below 1 are treated as 1.
pub fn scaled_for_level(base: &LevelGenConfig, level: u32) -> LevelGenConfig {
    let level = level.max(1);
    let mut scaled = base.clone();
    scaled.walker_count = (1 + level).min(MAX_WALKERS);
    scaled.shooter_count = (level / 2).min(MAX_SHOOTERS);
    scaled.shell_walker_count = (level / 2).min(MAX_SHELL_WALKERS);
    scaled.gap_count = (1 + level / 2).min(MAX_GAPS);
    scaled.max_gap_width = (2 + level / 2).min(MAX_GAP_WIDTH).max(base.min_gap_width);
    scaled.mushroom_count = 2u32.saturating_sub(level / 3).max(1);
    scaled.star_count = u32::from(level >= STAR_FROM_LEVEL);
    scaled.coin_arc_count = (2 + level / 2).min(MAX_COIN_ARCS);
    scaled.scattered_coin_count = (3 + level).min(MAX_SCATTERED_COINS);
    scaled
}

pub fn enemy_count(config: &LevelGenConfig) -> u32 {
    config.walker_count + config.shell_walker_count + config.shooter_count
}

pub fn power_up_count(config: &LevelGenConfig) -> u32 {
    config.mushroom_count + config.fire_flower_count + config.star_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_one_matches_the_documented_table() {
        let scaled = scaled_for_level(&LevelGenConfig::default(), 1);
        assert_eq!(scaled.walker_count, 2);
        assert_eq!(scaled.shooter_count, 0);
        assert_eq!(scaled.shell_walker_count, 0);
        assert_eq!(scaled.gap_count, 1);
        assert_eq!(scaled.max_gap_width, 2);
        assert_eq!(scaled.mushroom_count, 2);
        assert_eq!(scaled.star_count, 0);
        assert_eq!(scaled.coin_arc_count, 2);
        assert_eq!(scaled.scattered_coin_count, 4);
    }

    #[test]
    fn level_zero_is_clamped_to_one() {
        let base = LevelGenConfig::default();
        assert_eq!(scaled_for_level(&base, 0), scaled_for_level(&base, 1));
    }

    #[test]
    fn hazards_and_enemies_never_decrease() {
        let base = LevelGenConfig::default();
        for level in 1..40 {
            let here = scaled_for_level(&base, level);
            let next = scaled_for_level(&base, level + 1);
            assert!(enemy_count(&next) >= enemy_count(&here), "level {level}");
            assert!(next.gap_count >= here.gap_count, "level {level}");
            assert!(next.max_gap_width >= here.max_gap_width, "level {level}");
            assert!(next.coin_arc_count >= here.coin_arc_count, "level {level}");
            assert!(
                next.scattered_coin_count >= here.scattered_coin_count,
                "level {level}"
            );
            assert!(power_up_count(&next) <= power_up_count(&here), "level {level}");
        }
    }

    #[test]
    fn caps_hold_at_high_levels() {
        let scaled = scaled_for_level(&LevelGenConfig::default(), 1000);
        assert_eq!(scaled.walker_count, MAX_WALKERS);
        assert_eq!(scaled.shooter_count, MAX_SHOOTERS);
        assert_eq!(scaled.shell_walker_count, MAX_SHELL_WALKERS);
        assert_eq!(scaled.gap_count, MAX_GAPS);
        assert_eq!(scaled.max_gap_width, MAX_GAP_WIDTH);
        assert_eq!(scaled.mushroom_count, 1);
        assert_eq!(scaled.star_count, 1);
    }
}
