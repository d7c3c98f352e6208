use std::fs;
use std::path::{Path, PathBuf};

use miego_engine::{Gravity, TouchMapping, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "MIEGO_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config json: {message}")]
    Parse { message: String },
    #[error("parse config json at {path}: {message}")]
    ParseAt { path: String, message: String },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Immutable tuning for one run. Built once, then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub tile_size: f32,
    pub physics: PhysicsTuning,
    pub player: PlayerTuning,
    pub enemy: EnemyTuning,
    pub items: ItemTuning,
    pub projectiles: ProjectileTuning,
    pub scoring: ScoringRules,
    pub camera: CameraTuning,
    pub session: SessionTuning,
    pub level: LevelGenConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_size: 32.0,
            physics: PhysicsTuning::default(),
            player: PlayerTuning::default(),
            enemy: EnemyTuning::default(),
            items: ItemTuning::default(),
            projectiles: ProjectileTuning::default(),
            scoring: ScoringRules::default(),
            camera: CameraTuning::default(),
            session: SessionTuning::default(),
            level: LevelGenConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    pub gravity: f32,
    pub terminal_velocity: f32,
    /// Anything whose top drops below this height has left the world.
    pub fall_death_y: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity: -1400.0,
            terminal_velocity: -800.0,
            fall_death_y: -100.0,
        }
    }
}

impl PhysicsTuning {
    pub fn gravity(&self) -> Gravity {
        Gravity {
            acceleration: self.gravity,
            terminal_velocity: self.terminal_velocity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub small_size: Size,
    pub big_size: Size,
    pub ground_speed: f32,
    pub air_speed: f32,
    pub ground_acceleration: f32,
    pub ground_deceleration: f32,
    pub air_acceleration: f32,
    pub air_deceleration: f32,
    pub low_jump_impulse: f32,
    pub air_jump_impulse: f32,
    pub max_air_jumps: u32,
    pub coyote_seconds: f32,
    pub landing_velocity_threshold: f32,
    pub invulnerability_seconds: f32,
    pub star_seconds: f32,
    pub star_warning_seconds: f32,
    pub blink_interval_seconds: f32,
    pub freeze_seconds: f32,
    pub freeze_speed_multiplier: f32,
    pub stomp_bounce_speed: f32,
    pub death_pop_speed: f32,
    pub max_fireballs: usize,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            small_size: Size::new(24.0, 30.0),
            big_size: Size::new(24.0, 54.0),
            ground_speed: 180.0,
            air_speed: 140.0,
            ground_acceleration: 1400.0,
            ground_deceleration: 2400.0,
            air_acceleration: 600.0,
            air_deceleration: 150.0,
            low_jump_impulse: 609.0,
            air_jump_impulse: 861.0,
            max_air_jumps: 3,
            coyote_seconds: 0.1,
            landing_velocity_threshold: 10.0,
            invulnerability_seconds: 2.0,
            star_seconds: 10.0,
            star_warning_seconds: 2.0,
            blink_interval_seconds: 0.08,
            freeze_seconds: 2.0,
            freeze_speed_multiplier: 0.4,
            stomp_bounce_speed: 350.0,
            death_pop_speed: 400.0,
            max_fireballs: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    pub walker_size: Size,
    pub shell_walker_size: Size,
    pub shell_size: Size,
    pub stationary_size: Size,
    pub shooter_size: Size,
    pub walk_speed: f32,
    pub shooter_walk_speed: f32,
    pub shell_speed: f32,
    pub kick_grace_seconds: f32,
    pub shoot_interval_seconds: f32,
    pub stomp_tolerance: f32,
    pub stomp_max_vertical_speed: f32,
    pub settle_seconds: f32,
    pub knockout_seconds: f32,
    pub knockout_pop_speed: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            walker_size: Size::new(24.0, 26.0),
            shell_walker_size: Size::new(24.0, 34.0),
            shell_size: Size::new(24.0, 22.0),
            stationary_size: Size::new(24.0, 38.0),
            shooter_size: Size::new(40.0, 44.0),
            walk_speed: 50.0,
            shooter_walk_speed: 40.0,
            shell_speed: 300.0,
            kick_grace_seconds: 0.25,
            shoot_interval_seconds: 2.5,
            stomp_tolerance: 5.0,
            stomp_max_vertical_speed: 50.0,
            settle_seconds: 0.6,
            knockout_seconds: 1.2,
            knockout_pop_speed: 200.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemTuning {
    pub coin_size: Size,
    pub power_up_size: Size,
    pub emerge_speed: f32,
    pub mushroom_speed: f32,
    pub star_speed: f32,
    pub star_bounce_impulse: f32,
    pub lifetime_seconds: f32,
    pub coin_pop_seconds: f32,
    pub coin_pop_speed: f32,
}

impl Default for ItemTuning {
    fn default() -> Self {
        Self {
            coin_size: Size::new(16.0, 16.0),
            power_up_size: Size::new(28.0, 28.0),
            emerge_speed: 50.0,
            mushroom_speed: 80.0,
            star_speed: 100.0,
            star_bounce_impulse: 300.0,
            lifetime_seconds: 20.0,
            coin_pop_seconds: 0.6,
            coin_pop_speed: 250.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    pub fireball_size: Size,
    pub fireball_speed: f32,
    pub fireball_bounce_speed: f32,
    pub fireball_lifetime_seconds: f32,
    pub frost_size: Size,
    pub flame_size: Size,
    pub throw_speed: f32,
    pub throw_lift_ratio: f32,
    pub spawn_offset: Vec2,
    pub air_lifetime_seconds: f32,
    pub rest_seconds: f32,
    pub fade_seconds: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            fireball_size: Size::new(12.0, 12.0),
            fireball_speed: 400.0,
            fireball_bounce_speed: 250.0,
            fireball_lifetime_seconds: 3.0,
            frost_size: Size::new(16.0, 16.0),
            flame_size: Size::new(20.0, 20.0),
            throw_speed: 120.0,
            throw_lift_ratio: 0.4,
            spawn_offset: Vec2::new(30.0, 20.0),
            air_lifetime_seconds: 8.0,
            rest_seconds: 5.0,
            fade_seconds: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringRules {
    pub starting_lives: u32,
    pub coins_for_life: u32,
    pub coin_points: u64,
    pub stomp_points: u64,
    pub power_up_points: u64,
    pub brick_points: u64,
    pub max_combo_multiplier: u32,
    pub combo_window_seconds: f64,
    pub level_time_seconds: f32,
    pub time_bonus_per_second: u64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            starting_lives: 3,
            coins_for_life: 100,
            coin_points: 200,
            stomp_points: 100,
            power_up_points: 200,
            brick_points: 50,
            max_combo_multiplier: 8,
            combo_window_seconds: 0.5,
            level_time_seconds: 300.0,
            time_bonus_per_second: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraTuning {
    pub viewport: Size,
    pub lead_offset: f32,
    /// Fraction of the remaining distance closed per 1/60 s.
    pub smoothing: f32,
}

impl Default for CameraTuning {
    fn default() -> Self {
        Self {
            viewport: Size::new(844.0, 390.0),
            lead_offset: 60.0,
            smoothing: 0.08,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    pub respawn_delay_seconds: f32,
    pub level_complete_delay_seconds: f32,
    pub input_lockout_seconds: f32,
    pub block_bump_seconds: f32,
    pub touch_mapping: TouchMapping,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            respawn_delay_seconds: 2.0,
            level_complete_delay_seconds: 1.5,
            input_lockout_seconds: 0.25,
            block_bump_seconds: 0.15,
            touch_mapping: TouchMapping::default(),
        }
    }
}

/// Generator layout for difficulty level 1. `difficulty::scaled_for_level`
/// derives the other levels from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelGenConfig {
    pub width: u32,
    pub height: u32,
    pub min_gap_width: u32,
    pub max_gap_width: u32,
    pub gap_count: u32,
    pub pipe_count: u32,
    pub min_pipe_height: u32,
    pub max_pipe_height: u32,
    pub min_distance_between_pipes: u32,
    pub min_distance_from_water: u32,
    pub platform_overhang: u32,
    pub platform_height_above_ground: u32,
    pub walker_count: u32,
    pub shell_walker_count: u32,
    pub shooter_count: u32,
    pub min_distance_between_enemies: u32,
    pub min_enemy_distance_from_start: u32,
    pub enemy_attempts: u32,
    pub coin_arc_count: u32,
    pub coins_per_arc: u32,
    pub coin_arc_spacing: u32,
    pub coin_arc_row: u32,
    pub scattered_coin_count: u32,
    pub scattered_coin_rows: Vec<u32>,
    pub scattered_coin_attempts: u32,
    pub mushroom_count: u32,
    pub fire_flower_count: u32,
    pub star_count: u32,
    pub multi_coin_block_count: u32,
    pub question_block_count: u32,
    pub block_row_min: u32,
    pub block_row_max: u32,
    pub min_distance_between_blocks: u32,
    pub block_attempts: u32,
    pub safe_zone_from_start: u32,
    pub safe_zone_before_end: u32,
    pub player_start_column: u32,
    pub flagpole_columns_from_end: u32,
}

impl Default for LevelGenConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 14,
            min_gap_width: 2,
            max_gap_width: 3,
            gap_count: 2,
            pipe_count: 3,
            min_pipe_height: 2,
            max_pipe_height: 3,
            min_distance_between_pipes: 15,
            min_distance_from_water: 5,
            platform_overhang: 6,
            platform_height_above_ground: 3,
            walker_count: 2,
            shell_walker_count: 0,
            shooter_count: 1,
            min_distance_between_enemies: 15,
            min_enemy_distance_from_start: 20,
            enemy_attempts: 50,
            coin_arc_count: 3,
            coins_per_arc: 3,
            coin_arc_spacing: 3,
            coin_arc_row: 6,
            scattered_coin_count: 4,
            scattered_coin_rows: vec![4, 5, 7, 8],
            scattered_coin_attempts: 20,
            mushroom_count: 1,
            fire_flower_count: 1,
            star_count: 1,
            multi_coin_block_count: 1,
            question_block_count: 4,
            block_row_min: 3,
            block_row_max: 5,
            min_distance_between_blocks: 10,
            block_attempts: 30,
            safe_zone_from_start: 15,
            safe_zone_before_end: 10,
            player_start_column: 4,
            flagpole_columns_from_end: 5,
        }
    }
}

impl GameConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config: GameConfig = match serde_path_to_error::deserialize(&mut deserializer) {
            Ok(config) => config,
            Err(error) => {
                let path = error.path().to_string();
                let message = error.into_inner().to_string();
                return Err(if path.is_empty() || path == "." {
                    ConfigError::Parse { message }
                } else {
                    ConfigError::ParseAt { path, message }
                });
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(invalid("tile_size", "must be positive"));
        }
        if !(self.physics.gravity < 0.0) {
            return Err(invalid("physics.gravity", "must pull downward (negative)"));
        }
        if !(self.physics.terminal_velocity < 0.0) {
            return Err(invalid("physics.terminal_velocity", "must be negative"));
        }

        let sizes = [
            ("player.small_size", self.player.small_size),
            ("player.big_size", self.player.big_size),
            ("enemy.walker_size", self.enemy.walker_size),
            ("enemy.shell_walker_size", self.enemy.shell_walker_size),
            ("enemy.shell_size", self.enemy.shell_size),
            ("enemy.stationary_size", self.enemy.stationary_size),
            ("enemy.shooter_size", self.enemy.shooter_size),
            ("items.coin_size", self.items.coin_size),
            ("items.power_up_size", self.items.power_up_size),
            ("projectiles.fireball_size", self.projectiles.fireball_size),
            ("projectiles.frost_size", self.projectiles.frost_size),
            ("projectiles.flame_size", self.projectiles.flame_size),
            ("camera.viewport", self.camera.viewport),
        ];
        for (field, size) in sizes {
            if !size.is_valid() {
                return Err(invalid(
                    field,
                    format!("size must be positive, got {}x{}", size.width, size.height),
                ));
            }
        }
        if self.player.big_size.height < self.player.small_size.height {
            return Err(invalid("player.big_size", "must not be shorter than small_size"));
        }
        if !(0.0..=1.0).contains(&self.camera.smoothing) {
            return Err(invalid("camera.smoothing", "must be within [0, 1]"));
        }
        if self.scoring.coins_for_life == 0 {
            return Err(invalid("scoring.coins_for_life", "must be at least 1"));
        }
        if self.scoring.max_combo_multiplier == 0 {
            return Err(invalid("scoring.max_combo_multiplier", "must be at least 1"));
        }
        self.level.validate()
    }
}

impl LevelGenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.height < 8 {
            return Err(invalid("level.height", format!("{} rows is too short", self.height)));
        }
        let reserved = self.safe_zone_from_start + self.safe_zone_before_end + 20;
        if self.width < reserved {
            return Err(invalid(
                "level.width",
                format!("{} columns cannot fit safe zones needing {reserved}", self.width),
            ));
        }
        if self.player_start_column >= self.safe_zone_from_start {
            return Err(invalid("level.player_start_column", "must be inside the start safe zone"));
        }
        if self.flagpole_columns_from_end == 0
            || self.flagpole_columns_from_end > self.safe_zone_before_end
        {
            return Err(invalid(
                "level.flagpole_columns_from_end",
                "must be inside the end safe zone",
            ));
        }
        if self.min_gap_width == 0 || self.min_gap_width > self.max_gap_width {
            return Err(invalid("level.min_gap_width", "gap width range is inverted or empty"));
        }
        if self.min_pipe_height == 0 || self.min_pipe_height > self.max_pipe_height {
            return Err(invalid("level.min_pipe_height", "pipe height range is inverted or empty"));
        }
        if self.max_pipe_height + 3 > self.height {
            return Err(invalid("level.max_pipe_height", "pipes must fit below the top row"));
        }
        if self.block_row_min > self.block_row_max || self.block_row_max + 3 >= self.height {
            return Err(invalid("level.block_row_max", "block rows must sit above the ground"));
        }
        if self.platform_height_above_ground + 3 >= self.height {
            return Err(invalid(
                "level.platform_height_above_ground",
                "platform row must be inside the grid",
            ));
        }
        if self.coin_arc_row + 2 >= self.height
            || self.scattered_coin_rows.iter().any(|row| row + 2 >= self.height)
        {
            return Err(invalid("level.scattered_coin_rows", "coin rows must sit above the ground"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
